//! Route block partitioning and the parsing worker pool
//!
//! A block is one unindented line plus every indented line after it. Blocks
//! are parsed independently by a fixed set of workers; the assembler puts
//! the results back in console order.

use crate::document::Document;
use crate::lines::{Lines, is_indented, lines};
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use std::thread;
use tracing::error;

/// Splits console output into blocks
pub(crate) struct Blocks<'a> {
    lines: Lines<'a>,
    pending: Option<&'a str>,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: lines(text, true),
            pending: None,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut block: Vec<&'a str> = self.pending.take().into_iter().collect();
        for line in self.lines.by_ref() {
            if !is_indented(line) && !block.is_empty() {
                self.pending = Some(line);
                return Some(block);
            }
            block.push(line);
        }
        (!block.is_empty()).then_some(block)
    }
}

/// Parse every block of `text` on `workers` threads, preserving block order
pub(crate) fn parse_blocks<F>(text: &str, workers: usize, parse: F) -> Vec<Document>
where
    F: Fn(&[&str]) -> Vec<Document> + Sync,
{
    let workers = workers.max(1);
    let (block_tx, block_rx) = crossbeam_channel::bounded::<(usize, Vec<&str>)>(workers * 2);
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Vec<Document>)>();
    let parse = &parse;

    thread::scope(|scope| {
        for _ in 0..workers {
            let block_rx = block_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (position, block) in block_rx {
                    if result_tx.send((position, parse(&block))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(block_rx);
        drop(result_tx);

        let assembler = scope.spawn(move || assemble(result_rx));

        for (position, block) in Blocks::new(text).enumerate() {
            if block_tx.send((position, block)).is_err() {
                break;
            }
        }
        drop(block_tx);

        match assembler.join() {
            Ok(routes) => routes,
            Err(_) => {
                error!("Route assembler thread panicked, returning no routes");
                Vec::new()
            }
        }
    })
}

fn assemble(results: Receiver<(usize, Vec<Document>)>) -> Vec<Document> {
    let by_position: BTreeMap<usize, Vec<Document>> = results.into_iter().collect();
    by_position.into_values().flatten().collect()
}

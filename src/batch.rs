//! Concurrent generation of many texts from one grammar.
//!
//! Runs are spread over a bounded set of scoped worker threads. Each run owns
//! its random source and expansion context; the grammar itself is only read.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::debug;

use crate::grammar::Grammar;
use crate::utils::Result;

/// Generate `count` independent texts from `grammar`.
///
/// The returned texts are in request order. If any run fails, the failure
/// with the lowest index is returned and all other output is discarded.
pub fn generate_multiple(grammar: &Grammar, count: usize) -> Result<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let workers = grammar.config().worker_limit().min(count);
    debug!(count, workers, "starting batch generation");

    let next = AtomicUsize::new(0);
    let next = &next;
    let mut outcomes: Vec<(usize, Result<String>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(move |_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= count {
                            break;
                        }
                        done.push((index, grammar.run_at(index as u64)));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|p| panic::resume_unwind(p)))
            .collect()
    });

    outcomes.sort_unstable_by_key(|(index, _)| *index);

    let mut texts = Vec::with_capacity(count);
    for (index, outcome) in outcomes {
        texts.push(outcome.map_err(|err| err.at_index(index))?);
    }
    Ok(texts)
}

impl Grammar {
    /// Generate `count` texts concurrently, see [`generate_multiple`]
    pub fn generate_multiple(&self, count: usize) -> Result<Vec<String>> {
        generate_multiple(self, count)
    }
}

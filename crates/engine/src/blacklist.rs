//! Blacklist screening stage.
//!
//! Addresses are sent to the classifier in bounded chunks, several chunks in
//! flight at once, and every chunk is joined before the call returns. Verdicts
//! accumulate across calls so an address is classified at most once per run.

use futures::{stream, StreamExt, TryStreamExt};
use indexmap::IndexSet;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::{debug, info, warn};
use trustroute_core::{canonicalize, Address, RawVerdict, Verdict};

use crate::error::Result;
use crate::traits::BlacklistClassifier;

/// Accumulated allowed/blacklisted sets for one run.
pub struct BlacklistStage<'a> {
    classifier: Option<&'a dyn BlacklistClassifier>,
    chunk_size: NonZeroUsize,
    width: NonZeroUsize,
    allowed: HashSet<Address>,
    blacklisted: HashSet<Address>,
}

impl<'a> BlacklistStage<'a> {
    /// Create a stage. Without a classifier every address is allowed.
    pub fn new(
        classifier: Option<&'a dyn BlacklistClassifier>,
        chunk_size: NonZeroUsize,
        width: NonZeroUsize,
    ) -> Self {
        Self {
            classifier,
            chunk_size,
            width,
            allowed: HashSet::new(),
            blacklisted: HashSet::new(),
        }
    }

    /// Verdict for an address classified earlier in this run.
    pub fn verdict(&self, address: &Address) -> Option<Verdict> {
        if self.blacklisted.contains(address) {
            Some(Verdict::Blacklisted)
        } else if self.allowed.contains(address) {
            Some(Verdict::Allowed)
        } else {
            None
        }
    }

    /// Whether an address was classified as blacklisted.
    pub fn is_blacklisted(&self, address: &Address) -> bool {
        self.blacklisted.contains(address)
    }

    /// Classify every address not yet seen in this run.
    ///
    /// Returns how many addresses were newly classified.
    pub async fn classify<'b, I>(&mut self, candidates: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'b Address>,
    {
        let pending: IndexSet<Address> = candidates
            .into_iter()
            .filter(|a| self.verdict(a).is_none())
            .copied()
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let Some(classifier) = self.classifier else {
            self.allowed.extend(pending.iter().copied());
            return Ok(pending.len());
        };

        let pending: Vec<Address> = pending.into_iter().collect();
        let chunks: Vec<&[Address]> = pending.chunks(self.chunk_size.get()).collect();
        info!(
            "Screening {} address(es) in {} chunk(s)",
            pending.len(),
            chunks.len()
        );

        let responses: Vec<_> = stream::iter(chunks)
            .map(|chunk| async move {
                let verdicts = classifier.classify(chunk).await?;
                Ok::<_, anyhow::Error>((chunk, verdicts))
            })
            .buffered(self.width.get())
            .try_collect()
            .await?;

        for (chunk, verdicts) in responses {
            let missing = self.apply_chunk(chunk, &verdicts);
            if missing > 0 {
                debug!("{} address(es) without verdict, allowing", missing);
            }
        }

        Ok(pending.len())
    }

    /// Record verdicts for one requested chunk.
    ///
    /// Returns how many chunk addresses got no usable verdict.
    fn apply_chunk(&mut self, chunk: &[Address], verdicts: &[RawVerdict]) -> usize {
        let requested: HashSet<&Address> = chunk.iter().collect();
        let mut answered = HashSet::new();
        let mut flagged = HashSet::new();

        for raw in verdicts {
            let address = match canonicalize(&raw.address) {
                Ok(address) => address,
                Err(e) => {
                    warn!("Ignoring screening verdict: {}", e);
                    continue;
                }
            };
            if !requested.contains(&address) {
                debug!("Ignoring verdict for unrequested address {}", address);
                continue;
            }
            answered.insert(address);
            if raw.verdict() == Verdict::Blacklisted {
                flagged.insert(address);
            }
        }

        for address in chunk {
            if flagged.contains(address) {
                self.blacklisted.insert(*address);
            } else {
                self.allowed.insert(*address);
            }
        }

        chunk.iter().filter(|a| !answered.contains(*a)).count()
    }
}

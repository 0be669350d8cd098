//! Generated names for unnamed foreign keys.
//!
//! Names are fixed-length tokens drawn from a seeded ChaCha8 stream. The seed
//! is a hash of the request and the collection it lands in, so replaying the
//! same sequence of DDL against the same history reproduces the same names
//! across builds on 64-bit targets. A check-and-retry loop against the
//! collection guarantees uniqueness.

#![forbid(unsafe_code)]

use std::hash::Hasher;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rikv_result::{Error, Result};
use rikv_types::reserved::{
    GENERATED_NAME_ALPHABET, GENERATED_NAME_LEN, MAX_GENERATED_NAME_ATTEMPTS,
};
use rustc_hash::FxHasher;

use super::collection::ForeignKeyCollection;
use crate::names::NameKey;
use crate::types::Tag;

/// Inputs hashed into the generator seed.
pub(crate) struct NameSeed<'a> {
    pub child_table: NameKey,
    pub child_columns: &'a [Tag],
    pub parent_table: NameKey,
    pub parent_columns: &'a [Tag],
}

impl NameSeed<'_> {
    /// Lengths are written as `u64` rather than through `Hash`, which writes
    /// them as `usize`.
    fn seed(&self, collection: &ForeignKeyCollection) -> u64 {
        let mut hasher = FxHasher::default();
        write_name(&mut hasher, &self.child_table);
        write_tags(&mut hasher, self.child_columns);
        write_name(&mut hasher, &self.parent_table);
        write_tags(&mut hasher, self.parent_columns);
        hasher.write_u64(collection.len() as u64);
        for fk in collection.iter() {
            write_name(&mut hasher, &fk.key());
        }
        hasher.finish()
    }
}

fn write_name(hasher: &mut FxHasher, name: &NameKey) {
    hasher.write_u64(name.as_str().len() as u64);
    hasher.write(name.as_str().as_bytes());
}

fn write_tags(hasher: &mut FxHasher, tags: &[Tag]) {
    hasher.write_u64(tags.len() as u64);
    for &tag in tags {
        hasher.write_u64(tag);
    }
}

/// Produce a name no constraint in `collection` uses, case-insensitively.
pub(crate) fn generate_constraint_name(
    collection: &ForeignKeyCollection,
    seed: &NameSeed<'_>,
) -> Result<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.seed(collection));
    for _ in 0..MAX_GENERATED_NAME_ATTEMPTS {
        let candidate = random_token(&mut rng);
        if !collection.contains(&candidate) {
            return Ok(candidate);
        }
        tracing::trace!(candidate = %candidate, "generated foreign key name taken, retrying");
    }
    Err(Error::Internal(format!(
        "no unused foreign key name after {MAX_GENERATED_NAME_ATTEMPTS} attempts"
    )))
}

fn random_token<R: Rng>(rng: &mut R) -> String {
    (0..GENERATED_NAME_LEN)
        .map(|_| {
            let idx = rng.random_range(0..GENERATED_NAME_ALPHABET.len());
            GENERATED_NAME_ALPHABET[idx] as char
        })
        .collect()
}

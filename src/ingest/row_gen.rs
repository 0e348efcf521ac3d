use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng, TryRngCore};
use uuid::Builder;

use crate::errors::LoadError;
use crate::store::CellMutation;

/// One synthetic row: a key and the single cell written to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub mutation: CellMutation,
}

/// Source of row keys. Shared by all workers of a load run.
pub trait KeySource: Send + Sync {
    fn next_key(&self) -> Result<String, LoadError>;
}

/// Random (version 4) UUIDs drawn from the operating system's entropy source.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidKeySource;

impl KeySource for UuidKeySource {
    fn next_key(&self) -> Result<String, LoadError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| LoadError::KeyGeneration(err.to_string()))?;
        Ok(Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowSpec {
    pub family: String,
    pub column: String,
    pub bytes_per_row: usize,
}

impl Default for RowSpec {
    fn default() -> RowSpec {
        RowSpec {
            family: "family".to_string(),
            column: "column".to_string(),
            bytes_per_row: 2 * 1024,
        }
    }
}

/// Produces rows with fresh keys and `bytes_per_row` bytes of random payload.
/// Each worker owns one generator; the payload rng is not shared.
pub struct RowGenerator {
    spec: RowSpec,
    keys: Arc<dyn KeySource>,
    rng: SmallRng,
}

impl RowGenerator {
    pub fn new(spec: RowSpec, keys: Arc<dyn KeySource>) -> RowGenerator {
        RowGenerator {
            spec,
            keys,
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn with_seed(spec: RowSpec, keys: Arc<dyn KeySource>, seed: u64) -> RowGenerator {
        RowGenerator {
            spec,
            keys,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn spec(&self) -> &RowSpec {
        &self.spec
    }

    pub fn next_row(&mut self) -> Result<Row, LoadError> {
        let key = self.keys.next_key()?;
        let mut value = vec![0u8; self.spec.bytes_per_row];
        self.rng.fill_bytes(&mut value);
        Ok(Row {
            key,
            mutation: CellMutation {
                family: self.spec.family.clone(),
                column: self.spec.column.clone(),
                timestamp_micros: now_micros(),
                value,
            },
        })
    }

    /// Generates `count` rows, failing on the first key that cannot be produced.
    pub fn rows(&mut self, count: usize) -> Result<Vec<Row>, LoadError> {
        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            rows.push(self.next_row()?);
        }
        Ok(rows)
    }
}

/// Current time in microseconds, truncated to millisecond granularity which is
/// the default timestamp resolution of Bigtable tables.
pub fn now_micros() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    millis * 1000
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct ExhaustedKeys {
        remaining: AtomicUsize,
    }

    impl KeySource for ExhaustedKeys {
        fn next_key(&self) -> Result<String, LoadError> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Err(LoadError::KeyGeneration("entropy source exhausted".to_string()));
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            Ok(format!("key-{left}"))
        }
    }

    #[test]
    fn test_value_length_matches_row_bytes() {
        for bytes in [0, 1, 17, 1024, 4096] {
            let spec = RowSpec {
                bytes_per_row: bytes,
                ..RowSpec::default()
            };
            let mut gen = RowGenerator::new(spec, Arc::new(UuidKeySource));
            let row = gen.next_row().unwrap();
            assert_eq!(row.mutation.value.len(), bytes);
            assert_eq!(row.mutation.family, "family");
            assert_eq!(row.mutation.column, "column");
            assert_eq!(row.mutation.timestamp_micros % 1000, 0);
        }
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut gen = RowGenerator::new(RowSpec::default(), Arc::new(UuidKeySource));
        let rows = gen.rows(10_000).unwrap();
        let keys: HashSet<_> = rows.iter().map(|r| r.key.as_str()).collect();
        // 122 random bits per key, a collision here would be astronomically unlikely
        assert_eq!(keys.len(), rows.len());
        assert!(rows.iter().all(|r| r.key.len() == 36 && r.key.as_bytes()[14] == b'4'));
    }

    #[test]
    fn test_payload_is_random() {
        let spec = RowSpec {
            bytes_per_row: 64,
            ..RowSpec::default()
        };
        let mut gen = RowGenerator::with_seed(spec, Arc::new(UuidKeySource), 7);
        let a = gen.next_row().unwrap();
        let b = gen.next_row().unwrap();
        assert_ne!(a.mutation.value, b.mutation.value);
        assert_ne!(a.mutation.value, vec![0u8; 64]);
    }

    #[test]
    fn test_key_failure_aborts_batch() {
        let keys = Arc::new(ExhaustedKeys {
            remaining: AtomicUsize::new(3),
        });
        let mut gen = RowGenerator::new(RowSpec::default(), keys);
        match gen.rows(5) {
            Err(LoadError::KeyGeneration(msg)) => assert!(msg.contains("exhausted")),
            other => panic!("expected key generation error, got {:?}", other.map(|r| r.len())),
        }
    }
}

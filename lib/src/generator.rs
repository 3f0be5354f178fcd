use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::properties::Properties;
use crate::record::SeriesRecord;

/// Source of random records and jitter shared by all tasks of a burst.
///
/// The RNG is seeded once on construction and never reseeded.
pub struct RecordGenerator {
    rng: Mutex<SmallRng>,
    string_length: usize,
    comment: String,
    jitter_ms: RangeInclusive<u64>,
}

impl RecordGenerator {
    pub fn new(props: &Properties) -> Self {
        let rng = match props.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            string_length: props.string_length,
            comment: props.comment.clone(),
            jitter_ms: props.min_jitter_ms.min(props.max_jitter_ms)..=props.max_jitter_ms,
        }
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut SmallRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    pub fn jitter(&self) -> Duration {
        let ms = self.with_rng(|rng| rng.gen_range(self.jitter_ms.clone()));
        Duration::from_millis(ms)
    }

    pub fn next_record(&self) -> SeriesRecord {
        let (series_id, title, series_info) = self.with_rng(|rng| {
            (
                rng.gen::<u64>(),
                random_string(rng, self.string_length),
                random_string(rng, self.string_length),
            )
        });
        SeriesRecord {
            series_id,
            title,
            series_info,
            release_date: second_of_minute(SystemTime::now()),
            comment: self.comment.clone(),
        }
    }
}

fn random_string(rng: &mut SmallRng, len: usize) -> String {
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

fn second_of_minute(now: SystemTime) -> u32 {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    (secs % 60) as u32
}

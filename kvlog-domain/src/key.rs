//! Sortable record key generation
//!
//! Keys are `YYYYMMDD` + `T` + `HHMMSS` (UTC) followed by the wall clock's
//! three millisecond digits and the nanosecond component of a monotonic
//! high-resolution timer.

use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::value_objects::{DomainError, RecordKey, KEY_SECOND_FORMAT};

/// Largest sub-second tail a monotonic key can carry (`mmm` + 9 nanosecond digits).
const MAX_TAIL: u64 = 999_999_999_999;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

// =============================================================================
// Clock
// =============================================================================

/// Time source for key generation.
pub trait Clock: Send + Sync {
    /// Current UTC wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Nanosecond component (0..1e9) of a high-resolution monotonic timer
    fn hr_nanos(&self) -> u32;
}

/// Production clock: `Utc::now()` plus an `Instant` anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    /// Create a clock anchored at the current instant
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn hr_nanos(&self) -> u32 {
        self.anchor.elapsed().subsec_nanos()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, u32)>,
}

impl ManualClock {
    /// Create a clock frozen at `now` with the given timer nanoseconds
    pub fn new(now: DateTime<Utc>, hr_nanos: u32) -> Self {
        Self {
            state: Mutex::new((now, hr_nanos % NANOS_PER_SECOND)),
        }
    }

    /// Jump to a new wall-clock time and timer reading
    pub fn set(&self, now: DateTime<Utc>, hr_nanos: u32) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = (now, hr_nanos % NANOS_PER_SECOND);
    }

    /// Move the wall clock forward, leaving the timer reading untouched
    pub fn advance(&self, by: chrono::Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0 += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    fn hr_nanos(&self) -> u32 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

// =============================================================================
// Key Format
// =============================================================================

/// How the sub-second suffix is rendered.
///
/// Both formats share the `YYYYMMDDTHHMMSSmmm` prefix, so keys of different
/// formats order correctly against each other only across milliseconds.
/// Within one millisecond a padded monotonic key and an unpadded legacy key
/// compare by digit width, not by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFormat {
    /// Millis (3 digits) + zero-padded nanos (9 digits); strictly increasing
    /// per generator even when the clock stalls or steps back.
    #[default]
    Monotonic,
    /// Millis (3 digits) + unpadded nanos, exactly as historical keys were
    /// written. No ordering guarantee inside a millisecond.
    Legacy,
}

impl FromStr for KeyFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monotonic" => Ok(KeyFormat::Monotonic),
            "legacy" => Ok(KeyFormat::Legacy),
            other => Err(DomainError::InvalidKey(format!(
                "unknown key format: {}. Expected: monotonic, legacy",
                other
            ))),
        }
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFormat::Monotonic => write!(f, "monotonic"),
            KeyFormat::Legacy => write!(f, "legacy"),
        }
    }
}

// =============================================================================
// Key Generator
// =============================================================================

/// Issues record keys for one appender.
pub struct KeyGenerator {
    clock: Arc<dyn Clock>,
    format: KeyFormat,
    /// Last issued (second, tail) pair, monotonic format only
    last: Mutex<Option<(DateTime<Utc>, u64)>>,
}

impl KeyGenerator {
    /// Generator backed by the system clock
    pub fn new(format: KeyFormat) -> Self {
        Self::with_clock(Arc::new(SystemClock::new()), format)
    }

    /// Generator backed by a caller-supplied clock
    pub fn with_clock(clock: Arc<dyn Clock>, format: KeyFormat) -> Self {
        Self {
            clock,
            format,
            last: Mutex::new(None),
        }
    }

    /// Suffix format in use
    pub fn format(&self) -> KeyFormat {
        self.format
    }

    /// Derive the next key from the current clock readings.
    pub fn next_key(&self) -> RecordKey {
        let now = self.clock.now();
        let hr_nanos = self.clock.hr_nanos() % NANOS_PER_SECOND;
        // chrono reports >= 1000 ms during a leap second
        let millis = now.timestamp_subsec_millis().min(999);

        match self.format {
            KeyFormat::Legacy => RecordKey::from_rendered(format!(
                "{}{:03}{}",
                now.format(KEY_SECOND_FORMAT),
                millis,
                hr_nanos
            )),
            KeyFormat::Monotonic => {
                let candidate = (
                    now.trunc_subsecs(0),
                    u64::from(millis) * u64::from(NANOS_PER_SECOND) + u64::from(hr_nanos),
                );

                let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
                let next = match *last {
                    Some(previous) if candidate <= previous => successor(previous),
                    _ => candidate,
                };
                *last = Some(next);

                render_monotonic(next)
            }
        }
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(KeyFormat::default())
    }
}

impl fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Smallest (second, tail) pair strictly after `previous`
fn successor((second, tail): (DateTime<Utc>, u64)) -> (DateTime<Utc>, u64) {
    if tail >= MAX_TAIL {
        (second + chrono::Duration::seconds(1), 0)
    } else {
        (second, tail + 1)
    }
}

fn render_monotonic((second, tail): (DateTime<Utc>, u64)) -> RecordKey {
    RecordKey::from_rendered(format!("{}{:012}", second.format(KEY_SECOND_FORMAT), tail))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32, millis: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
            + chrono::Duration::milliseconds(i64::from(millis))
    }

    fn generator(clock: &Arc<ManualClock>, format: KeyFormat) -> KeyGenerator {
        KeyGenerator::with_clock(clock.clone(), format)
    }

    #[test]
    fn test_legacy_key_reproduces_historical_digits() {
        let clock = Arc::new(ManualClock::new(at(9, 5, 7, 42), 123_456));
        let keys = generator(&clock, KeyFormat::Legacy);

        assert_eq!(keys.next_key().as_str(), "20240115T090507042123456");
    }

    #[test]
    fn test_monotonic_key_pads_nanos() {
        let clock = Arc::new(ManualClock::new(at(9, 5, 7, 42), 123_456));
        let keys = generator(&clock, KeyFormat::Monotonic);

        assert_eq!(keys.next_key().as_str(), "20240115T090507042000123456");
    }

    #[test]
    fn test_legacy_and_monotonic_share_millisecond_prefix() {
        let clock = Arc::new(ManualClock::new(at(23, 59, 59, 999), 7));
        let legacy = generator(&clock, KeyFormat::Legacy).next_key();
        let monotonic = generator(&clock, KeyFormat::Monotonic).next_key();

        assert_eq!(&legacy.as_str()[..18], &monotonic.as_str()[..18]);
        assert_eq!(&legacy.as_str()[..18], "20240115T235959999");
    }

    #[test]
    fn test_monotonic_keys_strictly_increase_when_clock_stalls() {
        let clock = Arc::new(ManualClock::new(at(10, 0, 0, 500), 1_000));
        let keys = generator(&clock, KeyFormat::Monotonic);

        let first = keys.next_key();
        let second = keys.next_key();
        let third = keys.next_key();

        assert!(first < second);
        assert!(second < third);
        assert_eq!(third.as_str(), "20240115T100000500000001002");
    }

    #[test]
    fn test_monotonic_keys_survive_clock_stepping_back() {
        let clock = Arc::new(ManualClock::new(at(10, 0, 5, 0), 0));
        let keys = generator(&clock, KeyFormat::Monotonic);

        let before = keys.next_key();
        clock.set(at(10, 0, 4, 900), 0);
        let after = keys.next_key();

        assert!(before < after);
        assert_eq!(after.second(), before.second());
    }

    #[test]
    fn test_monotonic_keys_increase_across_width_boundary() {
        // Unpadded legacy digits would sort "...0009" after "...00010"
        let clock = Arc::new(ManualClock::new(at(10, 0, 0, 0), 9));
        let keys = generator(&clock, KeyFormat::Monotonic);
        let narrow = keys.next_key();

        clock.set(at(10, 0, 0, 0), 10);
        let wide = keys.next_key();

        assert!(narrow < wide);
    }

    #[test]
    fn test_mixed_formats_order_across_milliseconds_only() {
        let clock = Arc::new(ManualClock::new(at(10, 0, 0, 41), 999_999_999));
        let legacy_early = generator(&clock, KeyFormat::Legacy).next_key();
        clock.set(at(10, 0, 0, 42), 5);
        let monotonic_late = generator(&clock, KeyFormat::Monotonic).next_key();
        assert!(legacy_early < monotonic_late);

        // Same millisecond: legacy "...0429" sorts after monotonic "...042000000010"
        clock.set(at(10, 0, 0, 42), 9);
        let legacy_same = generator(&clock, KeyFormat::Legacy).next_key();
        clock.set(at(10, 0, 0, 42), 10);
        let monotonic_same = generator(&clock, KeyFormat::Monotonic).next_key();
        assert!(legacy_same > monotonic_same);
    }

    #[test]
    fn test_successor_carries_into_next_second() {
        let second = at(10, 0, 0, 0);
        let (next_second, tail) = successor((second, MAX_TAIL));

        assert_eq!(next_second, at(10, 0, 1, 0));
        assert_eq!(tail, 0);
    }

    #[test]
    fn test_monotonic_keys_follow_advancing_clock() {
        let clock = Arc::new(ManualClock::new(at(10, 0, 0, 0), 0));
        let keys = generator(&clock, KeyFormat::Monotonic);

        let mut previous = keys.next_key();
        for step in 1..50u32 {
            clock.advance(chrono::Duration::milliseconds(7));
            clock.set(clock.now(), step * 13);
            let next = keys.next_key();
            assert!(previous < next, "{} !< {}", previous, next);
            previous = next;
        }
    }

    #[test]
    fn test_generated_keys_parse_back() {
        let keys = KeyGenerator::new(KeyFormat::Monotonic);
        let key = keys.next_key();

        assert_eq!(RecordKey::parse(key.as_str()).unwrap(), key);
        assert_eq!(key.as_str().len(), 27);
    }

    #[test]
    fn test_key_format_from_str() {
        assert_eq!("legacy".parse::<KeyFormat>().unwrap(), KeyFormat::Legacy);
        assert_eq!("Monotonic".parse::<KeyFormat>().unwrap(), KeyFormat::Monotonic);
        assert!("random".parse::<KeyFormat>().is_err());
    }
}

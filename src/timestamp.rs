//! Presentation timestamp tracking across the hardware decoder.
//!
//! The decoder consumes input packets and later emits frames, possibly
//! reordered, without carrying timestamps through. [`PtsTracker`] keeps the
//! PTS of every submitted packet (tagged with its size) and lets the caller
//! bind one to a decoded frame's key once the decoder reports which input a
//! frame came from.

/// Number of packets that may be in flight inside the decoder.
pub const MAX_ENTRIES: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    id: u64,
    size: usize,
    key: Option<u64>,
    pts: f64,
    used: bool,
}

/// Fixed-capacity PTS table, oldest-first.
#[derive(Debug)]
pub struct PtsTracker {
    entries: [Entry; MAX_ENTRIES],
    next_id: u64,
}

impl PtsTracker {
    pub fn new() -> Self {
        Self {
            entries: [Entry::default(); MAX_ENTRIES],
            next_id: 0,
        }
    }

    /// Record the PTS of a packet of `size` bytes handed to the decoder.
    ///
    /// When the table is full the oldest entry is recycled.
    pub fn register(&mut self, pts: f64, size: usize) {
        let slot = match self.entries.iter().position(|e| !e.used) {
            Some(slot) => slot,
            None => {
                let slot = self.oldest(|_| true).unwrap_or(0);
                tracing::warn!(
                    evicted_pts = self.entries[slot].pts,
                    "PTS table full, recycling oldest entry"
                );
                slot
            }
        };

        self.entries[slot] = Entry {
            id: self.next_id,
            size,
            key: None,
            pts,
            used: true,
        };
        self.next_id += 1;
    }

    /// Bind the oldest unbound PTS to a decoded frame `key`.
    ///
    /// Entries registered with the same `size` are preferred; otherwise the
    /// oldest unbound entry is taken. Returns `false` if nothing is pending.
    pub fn associate(&mut self, size: usize, key: u64) -> bool {
        let slot = self
            .oldest(|e| e.key.is_none() && e.size == size)
            .or_else(|| self.oldest(|e| e.key.is_none()));

        match slot {
            Some(slot) => {
                self.entries[slot].key = Some(key);
                true
            }
            None => {
                tracing::trace!(size, key, "no pending PTS to associate");
                false
            }
        }
    }

    /// Take the PTS bound to `key`, freeing its entry.
    ///
    /// Keys may be reused before their entry is taken; the oldest binding
    /// is returned first.
    pub fn get(&mut self, key: u64) -> Option<f64> {
        let slot = self.oldest(|e| e.key == Some(key))?;
        let entry = &mut self.entries[slot];
        entry.used = false;
        Some(entry.pts)
    }

    /// Drop every pending entry (decoder flush / seek).
    pub fn flush(&mut self) {
        self.entries = [Entry::default(); MAX_ENTRIES];
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.used).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn oldest(&self, filter: impl Fn(&Entry) -> bool) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.used && filter(e))
            .min_by_key(|(_, e)| e.id)
            .map(|(slot, _)| slot)
    }
}

impl Default for PtsTracker {
    fn default() -> Self {
        Self::new()
    }
}

//! Component E: the manifest comparator.
//!
//! Three operations, all driven by the manifest's canonical
//! `(size, hash, path)` sort order:
//!
//! - [`equal_mod_time`] — are two manifests identical apart from timestamps?
//! - [`add_only`] — is `b` a strict superset of `a`'s content?
//! - [`diff`] — full new/deleted/moved/changed classification.

use crate::manifest::{Manifest, ManifestEntry};
use std::cmp::Ordering;

pub fn equal_mod_time(a: &Manifest, b: &Manifest) -> bool {
	a.entries.len() == b.entries.len()
		&& a.entries
			.iter()
			.zip(b.entries.iter())
			.all(|(x, y)| x.sort_key() == y.sort_key())
}

/// If `b`'s content is a superset of `a`'s (purely additive), returns the
/// indices into `b.entries` of the added entries. Otherwise `None`.
pub fn add_only(a: &Manifest, b: &Manifest) -> Option<Vec<usize>> {
	if a.entries.len() > b.entries.len() {
		return None;
	}

	let mut i = 0;
	let mut j = 0;
	let mut added = Vec::new();

	while i < a.entries.len() && j < b.entries.len() {
		let ka = a.entries[i].sort_key();
		let kb = b.entries[j].sort_key();
		match ka.cmp(&kb) {
			Ordering::Equal => {
				i += 1;
				j += 1;
			}
			Ordering::Greater => {
				// b has an entry that sorts before a's current entry: an addition
				added.push(j);
				j += 1;
			}
			Ordering::Less => return None, // a has an entry absent from b
		}
	}

	if i != a.entries.len() {
		return None;
	}
	added.extend(j..b.entries.len());
	Some(added)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffEvent {
	Deleted(ManifestEntry),
	New(ManifestEntry),
	Moved { from: ManifestEntry, to: ManifestEntry },
	Changed { old: ManifestEntry, new: ManifestEntry },
}

impl DiffEvent {
	pub fn path(&self) -> &str {
		match self {
			DiffEvent::Deleted(e) | DiffEvent::New(e) => &e.path,
			DiffEvent::Moved { to, .. } | DiffEvent::Changed { new: to, .. } => &to.path,
		}
	}
}

impl std::fmt::Display for DiffEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DiffEvent::Deleted(e) => write!(f, "[deleted] {}", crate::manifest::format_entry(e)),
			DiffEvent::New(e) => write!(f, "[new]     {}", crate::manifest::format_entry(e)),
			DiffEvent::Moved { from, to } => write!(
				f,
				"[moved]   {} -> {}",
				crate::manifest::format_entry(from),
				to.path
			),
			DiffEvent::Changed { old, new } => {
				write!(f, "[changed] {}", crate::manifest::format_entry(new))?;
				write!(f, " (was {})", crate::manifest::format_entry(old))
			}
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffCounts {
	pub deleted: usize,
	pub changed: usize,
	pub new: usize,
	pub moved: usize,
}

enum RawEvent {
	Deleted(ManifestEntry),
	New(ManifestEntry),
	Moved { from: ManifestEntry, to: ManifestEntry },
}

impl RawEvent {
	fn path(&self) -> &str {
		match self {
			RawEvent::Deleted(e) | RawEvent::New(e) => &e.path,
			RawEvent::Moved { to, .. } => &to.path,
		}
	}

	/// Tiebreaker so a `Deleted` and a `New` for the same path sort adjacent
	/// with `Deleted` first, making the changed-collapse pass below a simple
	/// single forward scan.
	fn rank(&self) -> u8 {
		match self {
			RawEvent::Deleted(_) => 0,
			RawEvent::New(_) => 1,
			RawEvent::Moved { .. } => 2,
		}
	}
}

/// Classifies the differences between sorted manifests `a` (old) and `b`
/// (new). Groups the changed-pair collapse by the exact parsed path rather
/// than a fixed character offset into the line, so paths of differing
/// length still pair up correctly.
pub fn diff(a: &Manifest, b: &Manifest) -> (Vec<DiffEvent>, DiffCounts) {
	let mut i = 0;
	let mut j = 0;
	let mut raw = Vec::new();

	while i < a.entries.len() || j < b.entries.len() {
		if i == a.entries.len() {
			raw.push(RawEvent::New(b.entries[j].clone()));
			j += 1;
			continue;
		}
		if j == b.entries.len() {
			raw.push(RawEvent::Deleted(a.entries[i].clone()));
			i += 1;
			continue;
		}

		let ea = &a.entries[i];
		let eb = &b.entries[j];

		if ea.sort_key() == eb.sort_key() {
			i += 1;
			j += 1;
		} else if ea.hash == eb.hash {
			raw.push(RawEvent::Moved {
				from: ea.clone(),
				to: eb.clone(),
			});
			i += 1;
			j += 1;
		} else if ea.sort_key() < eb.sort_key() {
			raw.push(RawEvent::Deleted(ea.clone()));
			i += 1;
		} else {
			raw.push(RawEvent::New(eb.clone()));
			j += 1;
		}
	}

	raw.sort_by(|x, y| x.path().cmp(y.path()).then(x.rank().cmp(&y.rank())));

	let mut events = Vec::with_capacity(raw.len());
	let mut counts = DiffCounts::default();
	let mut idx = 0;
	while idx < raw.len() {
		let collapses = idx + 1 < raw.len()
			&& matches!(raw[idx], RawEvent::Deleted(_))
			&& matches!(raw[idx + 1], RawEvent::New(_))
			&& raw[idx].path() == raw[idx + 1].path();

		if collapses {
			let old = match raw.remove(idx) {
				RawEvent::Deleted(e) => e,
				_ => unreachable!(),
			};
			let new = match raw.remove(idx) {
				RawEvent::New(e) => e,
				_ => unreachable!(),
			};
			events.push(DiffEvent::Changed { old, new });
			counts.changed += 1;
		} else {
			match raw.remove(idx) {
				RawEvent::Deleted(e) => {
					counts.deleted += 1;
					events.push(DiffEvent::Deleted(e));
				}
				RawEvent::New(e) => {
					counts.new += 1;
					events.push(DiffEvent::New(e));
				}
				RawEvent::Moved { from, to } => {
					counts.moved += 1;
					events.push(DiffEvent::Moved { from, to });
				}
			}
		}
	}

	(events, counts)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(size: u64, hash: &str, path: &str) -> ManifestEntry {
		ManifestEntry {
			size,
			mtime: "20240101.000000".to_string(),
			hash: hash.to_string(),
			path: path.to_string(),
		}
	}

	fn manifest_of(mut entries: Vec<ManifestEntry>) -> Manifest {
		let mut m = Manifest::new(std::mem::take(&mut entries));
		m.sort();
		m
	}

	const H1: &str = "1111111111111111111111111111111111111a";
	const H2: &str = "2222222222222222222222222222222222222b";
	const H3: &str = "3333333333333333333333333333333333333c";

	#[test]
	fn equal_mod_time_ignores_timestamp() {
		let mut a = manifest_of(vec![entry(1, H1, "a")]);
		let mut b = a.clone();
		b.entries[0].mtime = "20991231.235959".to_string();
		assert!(equal_mod_time(&a, &b));
		a.entries[0].path = "different".to_string();
		assert!(!equal_mod_time(&a, &b));
	}

	#[test]
	fn add_only_self_is_empty() {
		let m = manifest_of(vec![entry(1, H1, "a"), entry(2, H2, "b")]);
		assert_eq!(add_only(&m, &m), Some(vec![]));
	}

	#[test]
	fn add_only_detects_pure_addition() {
		let a = manifest_of(vec![entry(1, H1, "a")]);
		let b = manifest_of(vec![entry(1, H1, "a"), entry(2, H2, "b")]);
		let added = add_only(&a, &b).unwrap();
		assert_eq!(added.len(), 1);
		assert_eq!(b.entries[added[0]].path, "b");
	}

	#[test]
	fn add_only_rejects_deletion() {
		let a = manifest_of(vec![entry(1, H1, "a"), entry(2, H2, "b")]);
		let b = manifest_of(vec![entry(1, H1, "a")]);
		assert_eq!(add_only(&a, &b), None);
	}

	#[test]
	fn diff_detects_move() {
		let a = manifest_of(vec![entry(1, H1, "foo.txt")]);
		let b = manifest_of(vec![entry(1, H1, "sub/foo.txt")]);
		let (events, counts) = diff(&a, &b);
		assert_eq!(events.len(), 1);
		assert!(matches!(&events[0], DiffEvent::Moved { .. }));
		assert_eq!(counts, DiffCounts { moved: 1, ..Default::default() });
	}

	#[test]
	fn diff_collapses_same_path_into_changed() {
		let a = manifest_of(vec![entry(1, H1, "same.txt")]);
		let b = manifest_of(vec![entry(2, H2, "same.txt")]);
		let (events, counts) = diff(&a, &b);
		assert_eq!(events.len(), 1);
		assert!(matches!(&events[0], DiffEvent::Changed { .. }));
		assert_eq!(counts, DiffCounts { changed: 1, ..Default::default() });
	}

	#[test]
	fn diff_scenario_s5_deletion_and_new() {
		// prev: {a, b, c}; source: {a, b', d}
		let prev = manifest_of(vec![entry(1, H1, "a"), entry(1, H2, "b"), entry(1, H3, "c")]);
		let src = manifest_of(vec![entry(1, H1, "a"), entry(2, "4444444444444444444444444444444444444d", "b"), entry(3, "5555555555555555555555555555555555555e", "d")]);
		let (events, counts) = diff(&prev, &src);
		assert_eq!(counts.changed, 1); // b -> b'
		assert_eq!(counts.deleted, 1); // c
		assert_eq!(counts.new, 1); // d
		assert_eq!(events.len(), 3);
	}

	#[test]
	fn diff_event_count_matches_classified_paths() {
		let a = manifest_of(vec![entry(1, H1, "a"), entry(2, H2, "b")]);
		let b = manifest_of(vec![entry(1, H1, "a"), entry(3, H3, "c")]);
		let (events, counts) = diff(&a, &b);
		assert_eq!(events.len(), counts.deleted + counts.changed + counts.new + counts.moved);
	}
}

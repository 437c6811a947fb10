//! Natural ordering of version-suffix strings (`v2` < `v10`).
//!
//! Snapshot directories are named `<folder>.v<version>`; the version
//! component is compared digit-run by digit-run so that numeric suffixes
//! sort numerically rather than lexicographically.

use std::cmp::Ordering;

/// Compares two strings using natural ordering: runs of ASCII digits compare
/// numerically, everything else compares byte-for-byte.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
	let mut ai = a.chars().peekable();
	let mut bi = b.chars().peekable();

	loop {
		match (ai.peek(), bi.peek()) {
			(None, None) => return Ordering::Equal,
			(None, Some(_)) => return Ordering::Less,
			(Some(_), None) => return Ordering::Greater,
			(Some(&ca), Some(&cb)) => {
				if ca.is_ascii_digit() && cb.is_ascii_digit() {
					let na = take_digits(&mut ai);
					let nb = take_digits(&mut bi);
					// compare numerically, ignoring leading zeros
					let na_trimmed = na.trim_start_matches('0');
					let nb_trimmed = nb.trim_start_matches('0');
					let ord = na_trimmed
						.len()
						.cmp(&nb_trimmed.len())
						.then_with(|| na_trimmed.cmp(nb_trimmed));
					if ord != Ordering::Equal {
						return ord;
					}
					// same numeric value: fall back to the raw digit strings
					// so that e.g. "01" vs "1" still resolves deterministically
					let ord = na.cmp(&nb);
					if ord != Ordering::Equal {
						return ord;
					}
				} else {
					let ord = ca.cmp(&cb);
					if ord != Ordering::Equal {
						return ord;
					}
					ai.next();
					bi.next();
				}
			}
		}
	}
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars>) -> String {
	let mut s = String::new();
	while let Some(&c) = it.peek() {
		if c.is_ascii_digit() {
			s.push(c);
			it.next();
		} else {
			break;
		}
	}
	s
}

/// Extracts the version suffix from a snapshot directory name
/// (`"folder.v10"` -> `Some("10")`), given the folder's base name.
pub fn version_suffix<'a>(dir_name: &'a str, folder: &str) -> Option<&'a str> {
	let prefix = format!("{folder}.v");
	dir_name.strip_prefix(prefix.as_str())
}

/// Picks the natural-max version directory name out of a list of snapshot
/// directory names for the given folder, returning `(dir_name, version_suffix)`.
pub fn latest_version<'a>(folder: &str, dirs: impl Iterator<Item = &'a str>) -> Option<(&'a str, &'a str)> {
	dirs.filter_map(|d| version_suffix(d, folder).map(|v| (d, v)))
		.max_by(|(_, a), (_, b)| natural_cmp(a, b))
}

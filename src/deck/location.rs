//! The `#slide-<n>/step-<m>` hash convention.
//!
//! Hashes count from 1. [`Location`] counts from 0, where step 0 shows none of a slide's `reveal` elements
//! and step `k` shows the first `k`.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
	pub slide: usize,
	pub step: usize,
}

impl Location {
	#[must_use]
	pub fn new(slide: usize, step: usize) -> Self {
		Self { slide, step }
	}

	/// Parses `#slide-<n>` or `#slide-<n>/step-<m>`, with or without the leading `#`.
	///
	/// A missing step means the first one. `0` counts as `1`.
	#[must_use]
	pub fn parse_hash(hash: &str) -> Option<Self> {
		let hash = hash.strip_prefix('#').unwrap_or(hash);
		let mut segments = hash.split('/');
		let slide = parse_segment(segments.next()?, "slide-")?;
		let step = match segments.next() {
			Some(segment) => parse_segment(segment, "step-")?,
			None => 0,
		};
		if segments.next().is_some() {
			return None;
		}
		Some(Self { slide, step })
	}

	/// Clamps both indices, given each slide's number of `reveal` elements. Empty decks clamp to the default.
	#[must_use]
	pub fn clamp(self, reveals: &[usize]) -> Self {
		let last = match reveals.len().checked_sub(1) {
			Some(last) => last,
			None => return Self::default(),
		};
		let slide = self.slide.min(last);
		Self { slide, step: self.step.min(reveals[slide]) }
	}

	/// The next step, or the next slide's first step. [`None`] at the very end.
	#[must_use]
	pub fn next(self, reveals: &[usize]) -> Option<Self> {
		let current = self.clamp(reveals);
		let &steps = reveals.get(current.slide)?;
		if current.step < steps {
			Some(Self { step: current.step + 1, ..current })
		} else if current.slide + 1 < reveals.len() {
			Some(Self::new(current.slide + 1, 0))
		} else {
			None
		}
	}

	/// The previous step, or the previous slide's last step. [`None`] at the very start.
	#[must_use]
	pub fn previous(self, reveals: &[usize]) -> Option<Self> {
		let current = self.clamp(reveals);
		reveals.get(current.slide)?;
		if current.step > 0 {
			Some(Self { step: current.step - 1, ..current })
		} else if current.slide > 0 {
			Some(Self::new(current.slide - 1, reveals[current.slide - 1]))
		} else {
			None
		}
	}
}

fn parse_segment(segment: &str, prefix: &str) -> Option<usize> {
	let digits = segment.strip_prefix(prefix)?;
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	Some(digits.parse::<usize>().ok()?.saturating_sub(1))
}

/// Formats as a hash, including the `#`.
impl Display for Location {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#slide-{}/step-{}", self.slide + 1, self.step + 1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_one_based_hashes() {
		assert_eq!(Location::parse_hash("#slide-2/step-3"), Some(Location::new(1, 2)));
		assert_eq!(Location::parse_hash("slide-1/step-1"), Some(Location::new(0, 0)));
	}

	#[test]
	fn missing_step_is_first() {
		assert_eq!(Location::parse_hash("#slide-4"), Some(Location::new(3, 0)));
	}

	#[test]
	fn rejects_malformed_hashes() {
		for hash in ["", "#", "#slide-", "#slide-x", "#slide-+1", "#slide-1/", "#slide-1/step-", "#slide-1/step-2/extra", "#step-1", "#slides-1"] {
			assert_eq!(Location::parse_hash(hash), None, "{hash:?}");
		}
	}

	#[test]
	fn zero_counts_as_one() {
		assert_eq!(Location::parse_hash("#slide-0/step-0"), Some(Location::new(0, 0)));
	}

	#[test]
	fn formats_one_based() {
		assert_eq!(Location::new(1, 2).to_string(), "#slide-2/step-3");
		assert_eq!(Location::parse_hash(&Location::new(5, 0).to_string()), Some(Location::new(5, 0)));
	}

	#[test]
	fn clamps() {
		let reveals = [0, 2, 1];
		assert_eq!(Location::new(7, 9).clamp(&reveals), Location::new(2, 1));
		assert_eq!(Location::new(1, 9).clamp(&reveals), Location::new(1, 2));
		assert_eq!(Location::new(3, 3).clamp(&[]), Location::default());
	}

	#[test]
	fn steps_before_slides() {
		let reveals = [0, 2, 1];
		let mut location = Location::default();
		let mut visited = vec![location];
		while let Some(next) = location.next(&reveals) {
			location = next;
			visited.push(location);
		}
		assert_eq!(
			visited,
			[Location::new(0, 0), Location::new(1, 0), Location::new(1, 1), Location::new(1, 2), Location::new(2, 0), Location::new(2, 1)]
		);

		let mut backwards = vec![location];
		while let Some(previous) = location.previous(&reveals) {
			location = previous;
			backwards.push(location);
		}
		backwards.reverse();
		assert_eq!(backwards, visited);
	}

	#[test]
	fn no_movement_in_empty_deck() {
		assert_eq!(Location::default().next(&[]), None);
		assert_eq!(Location::default().previous(&[]), None);
	}
}

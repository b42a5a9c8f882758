// ---------------------------------------------------------------------------
// Match Aggregator: threshold-dependent counts
// ---------------------------------------------------------------------------
//
// Every call is a full pass over the match list: reset, filter on
// `similarity > threshold`, recount. There is no delta tracking, so calling
// it twice with the same threshold leaves identical state behind.
// ---------------------------------------------------------------------------

use crate::types::{Document, Match, Topic};

/// A match is active only when its similarity strictly exceeds the threshold.
pub fn survives(m: &Match, threshold: f64) -> bool {
	m.similarity > threshold
}

/// Matches active at `threshold`, in input order.
pub fn surviving(matches: &[Match], threshold: f64) -> impl Iterator<Item = &Match> {
	matches.iter().filter(move |m| survives(m, threshold))
}

/// Drop matches that point outside the topic or document arrays.
///
/// Returns the kept matches and how many were dropped. A single corrupt edge
/// never makes the corpus unusable.
pub fn validate_matches(matches: Vec<Match>, topic_count: usize, doc_count: usize) -> (Vec<Match>, usize) {
	let before = matches.len();
	let kept: Vec<Match> = matches
		.into_iter()
		.filter(|m| m.topic < topic_count && m.doc < doc_count)
		.collect();
	let dropped = before - kept.len();
	if dropped > 0 {
		tracing::warn!(dropped, "Dropped matches referencing unknown topics or documents");
	}
	(kept, dropped)
}

/// Recompute `topic.count`, `doc.count` and `doc.topics` for `threshold`.
///
/// Duplicate matches for the same (doc, topic) pair are counted and listed
/// once per match.
pub fn aggregate(topics: &mut [Topic], docs: &mut [Document], matches: &[Match], threshold: f64) {
	for topic in topics.iter_mut() {
		topic.count = 0;
	}
	for doc in docs.iter_mut() {
		doc.count = 0;
		doc.topics.clear();
	}

	for m in surviving(matches, threshold) {
		// Check both sides before touching either.
		if m.topic >= topics.len() || m.doc >= docs.len() {
			continue;
		}
		topics[m.topic].count += 1;
		let doc = &mut docs[m.doc];
		doc.count += 1;
		doc.topics.push(m.topic);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::abc_corpus;
	use crate::types::Corpus;

	fn counts(corpus: &Corpus) -> Vec<usize> {
		corpus.topics.iter().map(|t| t.count).collect()
	}

	#[test]
	fn counts_at_two_thresholds() {
		let mut c = abc_corpus();
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.5);
		assert_eq!(counts(&c), vec![1, 1, 0]);
		assert_eq!(c.docs[0].topics, vec![0, 1]);
		assert!(c.docs[1].topics.is_empty());

		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.3);
		assert_eq!(counts(&c), vec![1, 2, 1]);
		assert_eq!(c.docs[1].topics, vec![1, 2]);
	}

	#[test]
	fn match_exactly_at_threshold_is_excluded() {
		let mut c = abc_corpus();
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.4);
		assert_eq!(counts(&c), vec![1, 1, 0]);
	}

	#[test]
	fn aggregate_is_idempotent() {
		let mut c = abc_corpus();
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.3);
		let first = (c.topics.clone(), c.docs.clone());
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.3);
		assert_eq!(first, (c.topics.clone(), c.docs.clone()));
	}

	#[test]
	fn doc_count_matches_topic_list_length() {
		let mut c = abc_corpus();
		c.matches.push(Match { doc: 0, topic: 0, similarity: 0.95 });
		for threshold in [0.0, 0.3, 0.5, 0.9, 1.0] {
			aggregate(&mut c.topics, &mut c.docs, &c.matches, threshold);
			for doc in &c.docs {
				assert_eq!(doc.count, doc.topics.len());
			}
		}
	}

	#[test]
	fn duplicate_matches_are_preserved() {
		let mut c = abc_corpus();
		c.matches.push(Match { doc: 0, topic: 0, similarity: 0.95 });
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.5);
		assert_eq!(c.topics[0].count, 2);
		assert_eq!(c.docs[0].topics, vec![0, 1, 0]);
	}

	#[test]
	fn surviving_sets_shrink_as_threshold_rises() {
		let c = abc_corpus();
		let thresholds = [0.0, 0.2, 0.4, 0.5, 0.89, 0.9, 1.0];
		for pair in thresholds.windows(2) {
			let low: Vec<&Match> = surviving(&c.matches, pair[0]).collect();
			let high: Vec<&Match> = surviving(&c.matches, pair[1]).collect();
			assert!(high.iter().all(|m| low.contains(m)));
		}
	}

	#[test]
	fn out_of_range_matches_are_dropped() {
		let c = abc_corpus();
		let mut matches = c.matches.clone();
		matches.push(Match { doc: 5, topic: 0, similarity: 0.9 });
		matches.push(Match { doc: 0, topic: 3, similarity: 0.9 });
		let (kept, dropped) = validate_matches(matches, c.topics.len(), c.docs.len());
		assert_eq!(dropped, 2);
		assert_eq!(kept, c.matches);
	}

	#[test]
	fn aggregate_skips_unvalidated_bad_indices() {
		let mut c = abc_corpus();
		c.matches.push(Match { doc: 9, topic: 0, similarity: 0.9 });
		aggregate(&mut c.topics, &mut c.docs, &c.matches, 0.5);
		assert_eq!(counts(&c), vec![1, 1, 0]);
	}
}

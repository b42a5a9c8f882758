//! Shared corpora for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::StoryError;
use crate::narrative::Step;
use crate::selection::ActiveSet;
use crate::types::{Corpus, Document, Match, Panel, Topic};
use crate::views::{StepObserver, View, ViewFrame};

fn topic(t: &str, s: &str) -> Topic {
	Topic {
		topic: t.into(),
		subtopic: s.into(),
		..Default::default()
	}
}

fn doc(chapter: &str, section: &str, para: &str) -> Document {
	Document {
		chapter: chapter.into(),
		section: section.into(),
		para: para.into(),
		..Default::default()
	}
}

fn m(doc: usize, topic: usize, similarity: f64) -> Match {
	Match { doc, topic, similarity }
}

/// Three topics A, B, C and two documents: doc0 matches A and B at 0.9,
/// doc1 matches B and C at 0.4. A and B share a parent, C does not.
pub(crate) fn abc_corpus() -> Corpus {
	Corpus::new(
		vec![topic("T1", "A"), topic("T1", "B"), topic("T2", "C")],
		vec![doc("one", "S", "first"), doc("two", "S", "second")],
		vec![m(0, 0, 0.9), m(0, 1, 0.9), m(1, 1, 0.4), m(1, 2, 0.4)],
	)
}

/// A small two-paper corpus with three parent topics.
pub(crate) fn story_corpus() -> Corpus {
	Corpus::new(
		vec![
			topic("Ethics", "privacy"),
			topic("Ethics", "bias"),
			topic("Ethics", "consent"),
			topic("Tech", "models"),
			topic("Tech", "data"),
			topic("Policy", "law"),
		],
		vec![
			doc("Paper 1", "Intro", "Privacy and bias in models."),
			doc("Paper 1", "Intro", "Consent matters."),
			doc("Paper 1", "Methods", "We trained models on data."),
			doc("Paper 2", "Intro", "Law and privacy."),
			doc("Paper 2", "Results", "Bias in data."),
		],
		vec![
			m(0, 0, 0.92),
			m(0, 1, 0.88),
			m(0, 3, 0.81),
			m(1, 2, 0.90),
			m(2, 3, 0.95),
			m(2, 4, 0.86),
			m(3, 5, 0.91),
			m(3, 0, 0.84),
			m(4, 1, 0.89),
			m(4, 4, 0.79),
		],
	)
}

// ---------------------------------------------------------------------------
// Recording renderers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
	Render(ViewFrame),
	Update(Panel, ActiveSet),
	Fade(Panel, bool),
	Reset(usize),
}

pub(crate) type EventLog = Rc<RefCell<Vec<Event>>>;

/// A view that appends every call to a shared log. With `fail_render` set,
/// rendering returns a view error after logging.
pub(crate) struct RecordingView {
	pub panel: Panel,
	pub log: EventLog,
	pub fail_render: bool,
}

impl View for RecordingView {
	fn panel(&self) -> Panel {
		self.panel
	}

	fn render(&mut self, frame: &ViewFrame) -> Result<(), StoryError> {
		self.log.borrow_mut().push(Event::Render(frame.clone()));
		if self.fail_render {
			return Err(StoryError::View {
				panel: self.panel,
				message: "renderer unavailable".into(),
			});
		}
		Ok(())
	}

	fn update(&mut self, active: &ActiveSet) -> Result<(), StoryError> {
		self.log.borrow_mut().push(Event::Update(self.panel, active.clone()));
		Ok(())
	}

	fn set_faded(&mut self, faded: bool) -> Result<(), StoryError> {
		self.log.borrow_mut().push(Event::Fade(self.panel, faded));
		Ok(())
	}
}

pub(crate) struct RecordingObserver {
	pub log: EventLog,
}

impl StepObserver for RecordingObserver {
	fn reset(&mut self, steps: &[Step]) -> Result<(), StoryError> {
		self.log.borrow_mut().push(Event::Reset(steps.len()));
		Ok(())
	}
}

/// One recording view per panel plus a recording observer, all sharing `log`.
pub(crate) fn recording_surface(log: &EventLog) -> (Vec<Box<dyn View>>, Box<dyn StepObserver>) {
	let views: Vec<Box<dyn View>> = Panel::ALL
		.iter()
		.map(|&panel| {
			Box::new(RecordingView {
				panel,
				log: Rc::clone(log),
				fail_render: false,
			}) as Box<dyn View>
		})
		.collect();
	(views, Box::new(RecordingObserver { log: Rc::clone(log) }))
}

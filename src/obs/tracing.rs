// crates.io
use tracing::{Instrument, Span, field, instrument::Instrumented};
// self
use crate::{
	_prelude::*,
	obs::{OpKind, OpOutcome},
};

/// Span wrapping one gateway operation.
///
/// The span is named `monitor_gateway.op` and carries `op`, `stage`, and, once recorded,
/// `outcome`.
#[derive(Clone, Debug)]
pub struct OpSpan(Span);
impl OpSpan {
	/// Opens a span for `kind` at the given call site.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		Self(tracing::info_span!(
			"monitor_gateway.op",
			op = kind.as_str(),
			stage,
			outcome = field::Empty
		))
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.0.clone())
	}

	/// Fills the span's `outcome` field.
	pub fn record_outcome(&self, outcome: OpOutcome) {
		self.0.record("outcome", outcome.as_str());
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::{OpKind, OpOutcome, OpSpan};

	#[tokio::test]
	async fn instrumented_future_keeps_its_output() {
		let span = OpSpan::new(OpKind::Refresh, "instrumented_future_keeps_its_output");
		let value = span.instrument(async { 42 }).await;

		span.record_outcome(OpOutcome::Success);

		assert_eq!(value, 42);
	}
}

use std::fmt;

use inspect::channel;
use serde::Serialize;

use crate::output::{self, OutputFormat, ResultBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelsData {
	/// Commands a session subscribes to.
	pub inbound: Vec<&'static str>,
	/// Selections a host forwards.
	pub outbound: Vec<&'static str>,
}

impl ChannelsData {
	pub fn current() -> Self {
		Self {
			inbound: channel::INBOUND.to_vec(),
			outbound: vec![channel::SELECT_NODE, channel::HOVER_NODE],
		}
	}
}

impl fmt::Display for ChannelsData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "inbound:")?;
		for name in &self.inbound {
			writeln!(f, "  {name}")?;
		}
		writeln!(f, "outbound:")?;
		for name in &self.outbound {
			writeln!(f, "  {name}")?;
		}
		Ok(())
	}
}

pub fn execute(format: OutputFormat) {
	let result = ResultBuilder::new("channels").data(ChannelsData::current()).build();
	output::print_result(&result, format);
}

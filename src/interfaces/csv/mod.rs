//! CSV interface for the scenario replay binary: an instruction reader on the
//! way in, an order-book report writer on the way out.

pub mod instruction_reader;
pub mod order_writer;

pub mod affiliate_writer;
pub mod command_reader;

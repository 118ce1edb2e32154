mod byte_cursor;
pub(crate) mod bytes;
mod hexdump;
mod time;

pub(crate) use self::byte_cursor::{ByteCursor, ascii_field};
pub use self::hexdump::{hexdump, hexdump_json};
pub use self::time::BcdTime;

//! A backtracking scanner for FreeSpace table files (`.tbl` / `.tbm`).

mod cancel;
pub use cancel::{CancelSignal, Cancelled};

mod error;
pub use error::{ScanError, SyntaxError, SyntaxErrorKind};

mod position;
pub use position::{Position, Range};

mod token;
pub use token::{Token, TokenKind};

mod scanner;
pub use scanner::Scanner;

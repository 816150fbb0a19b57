//! Schema-driven parsing of FreeSpace table files.
//!
//! A table is described declaratively with [`schema::build`] and parsed with
//! [`parse`]. Parsing never stops at the first problem: failures inside a
//! section are recorded as [`Diagnostic`]s and the parser continues with the
//! next field, so one pass reports every independent defect.
//!
//! ```
//! use fsotbl_parse::schema::build::*;
//! use fsotbl_parse::{CancelSignal, Value, parse};
//!
//! let schema = vec![section("#Ships", [string("$Name").required()])];
//! let output = parse(&schema, "#Ships\n$Name: GTF Ulysses\n#End\n", CancelSignal::new()).unwrap();
//! assert!(output.errors.is_empty());
//! assert_eq!(
//!     output.values[0].as_ref().and_then(|ships| ships.get("Name")),
//!     Some(&Value::from("GTF Ulysses"))
//! );
//! ```

mod decoders;

mod diagnostic;
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};

mod parser;
pub use parser::{ParseOutput, parse};

pub mod schema;
pub use schema::{Field, Node, NodeKind, ValueType};

mod scope;
pub use scope::ScopeInfo;

mod value;
pub use value::{Attributes, Value};

pub use fsotbl_scanner::{CancelSignal, Cancelled, Position, Range};

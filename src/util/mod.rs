pub use clock::*;
pub use enums::*;
pub use result::*;

mod clock;
mod enums;
mod result;

mod user;
pub use user::*;

mod room;
pub use room::*;

mod room_member;
pub use room_member::*;

mod game_round;
pub use game_round::*;

mod guess;
pub use guess::*;

mod transaction;
pub use transaction::*;

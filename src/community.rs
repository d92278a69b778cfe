pub use self::badges::badges_for;
pub use self::quiz::{QuizError, QUESTIONS};
pub use self::roles::{PATHWAYS, Pathway, RoleDirectory};

pub mod badges;
pub mod quiz;
pub mod roles;

//! Repository module - decentralized data access layer.

mod curse_word_repository;
mod guild_repository;
mod moderation_repository;
mod profile_repository;
mod temporary_repository;
mod warns_repository;

pub use curse_word_repository::CurseWordRepository;
pub use guild_repository::GuildRepository;
pub use moderation_repository::ModerationRepository;
pub use profile_repository::ProfileRepository;
pub use temporary_repository::TemporaryActionRepository;
pub use warns_repository::{timeout_duration_for, WarnsRepository, TIMEOUT_LADDER};

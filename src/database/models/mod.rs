//! Database model exports.

pub mod curse_word;
pub mod guild;
pub mod moderation;
pub mod profile;
pub mod temporary;
pub mod warning;

pub use curse_word::{normalize_word, CurseWordEntry, Severity, DEFAULT_CURSE_WORDS};
pub use guild::{BanInfo, GuildConfig, GuildPatch, GuildUpdate, MuteInfo};
pub use moderation::{ModerationAction, ModerationRecord, DEFAULT_REASON};
pub use profile::{Badge, ProfileDetails, ProfileStat, ProfileUpdate, UserProfile, UserStats};
pub use temporary::{TemporaryAction, TemporaryActionKind};
pub use warning::WarningRecord;

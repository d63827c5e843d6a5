use crate::types::{ItemId, RunId, Tick};
use serde::{Deserialize, Serialize};

/// All player-issued commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Trading hours ─────────────────────────────
    OpenShop,
    CloseShop,

    // ── Clock control ─────────────────────────────
    SetTimeScale { multiplier: u32 },
    TogglePause,
    SpeedUp,
    SlowDown,
    NormalSpeed,

    // ── Stock ─────────────────────────────────────
    BuyWholesale {
        item_id:  ItemId,
        quantity: u32,
    },
    PlaceOnShelf {
        item_id:  ItemId,
        quantity: u32,
        price:    f64,
    },
    RemoveFromShelf {
        item_id:  ItemId,
        price:    f64,
        quantity: u32,
    },
}

impl PlayerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenShop => "open_shop",
            Self::CloseShop => "close_shop",
            Self::SetTimeScale { .. } => "set_time_scale",
            Self::TogglePause => "toggle_pause",
            Self::SpeedUp => "speed_up",
            Self::SlowDown => "slow_down",
            Self::NormalSpeed => "normal_speed",
            Self::BuyWholesale { .. } => "buy_wholesale",
            Self::PlaceOnShelf { .. } => "place_on_shelf",
            Self::RemoveFromShelf { .. } => "remove_from_shelf",
        }
    }
}

/// A queued player command with its submission tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub run_id:     RunId,
    pub queued_at:  Tick,
    pub command_id: String,
    pub command:    PlayerCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: PlayerCommand = serde_json::from_str(
            r#"{"cmd":"place_on_shelf","item_id":"Bread","quantity":5,"price":1.2}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            PlayerCommand::PlaceOnShelf { item_id: "Bread".into(), quantity: 5, price: 1.2 }
        );
        let cmd: PlayerCommand = serde_json::from_str(r#"{"cmd":"open_shop"}"#).unwrap();
        assert_eq!(cmd.name(), "open_shop");
    }
}

//! Sentiment bands and the advice attached to each

use std::fmt;

/// Five named ranges partitioning the 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SentimentBand {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

/// Human-readable interpretation of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advice {
    pub label: &'static str,
    pub guidance: &'static str,
    pub strategy_hint: &'static str,
}

impl SentimentBand {
    /// All bands, lowest first
    pub const ALL: [SentimentBand; 5] = [
        SentimentBand::ExtremeFear,
        SentimentBand::Fear,
        SentimentBand::Neutral,
        SentimentBand::Greed,
        SentimentBand::ExtremeGreed,
    ];

    /// Map a score to its band. Values above 100 land in ExtremeGreed.
    pub fn classify(value: u8) -> Self {
        match value {
            0..=25 => SentimentBand::ExtremeFear,
            26..=45 => SentimentBand::Fear,
            46..=55 => SentimentBand::Neutral,
            56..=75 => SentimentBand::Greed,
            _ => SentimentBand::ExtremeGreed,
        }
    }

    /// Inclusive score range covered by this band
    pub fn range(&self) -> (u8, u8) {
        match self {
            SentimentBand::ExtremeFear => (0, 25),
            SentimentBand::Fear => (26, 45),
            SentimentBand::Neutral => (46, 55),
            SentimentBand::Greed => (56, 75),
            SentimentBand::ExtremeGreed => (76, 100),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            SentimentBand::ExtremeFear => "😱",
            SentimentBand::Fear => "😰",
            SentimentBand::Neutral => "😐",
            SentimentBand::Greed => "😊",
            SentimentBand::ExtremeGreed => "🤑",
        }
    }

    pub fn advice(&self) -> Advice {
        match self {
            SentimentBand::ExtremeFear => Advice {
                label: "🔴 Extreme Fear",
                guidance: "📈 Value opportunity: consider quality names. Contrarian entries tend to pay off here.",
                strategy_hint: "💰 Accumulate gradually",
            },
            SentimentBand::Fear => Advice {
                label: "🟠 Fear",
                guidance: "📊 Review valuations on your watchlist. Good businesses may be on sale.",
                strategy_hint: "🎯 Selective buying",
            },
            SentimentBand::Neutral => Advice {
                label: "🟡 Neutral",
                guidance: "⚖️ Keep investing as usual. A good time for scheduled contributions.",
                strategy_hint: "🔄 Stay on your regular plan",
            },
            SentimentBand::Greed => Advice {
                label: "🟢 Greed",
                guidance: "⚠️ The market is heating up. Buy carefully and avoid overvalued names.",
                strategy_hint: "🚨 Proceed with caution",
            },
            SentimentBand::ExtremeGreed => Advice {
                label: "🔥 Extreme Greed",
                guidance: "🚨 Valuations are stretched. Consider trimming positions and raising cash.",
                strategy_hint: "💸 Consider taking profits",
            },
        }
    }
}

impl fmt::Display for SentimentBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SentimentBand::ExtremeFear => "Extreme Fear",
            SentimentBand::Fear => "Fear",
            SentimentBand::Neutral => "Neutral",
            SentimentBand::Greed => "Greed",
            SentimentBand::ExtremeGreed => "Extreme Greed",
        };
        f.write_str(name)
    }
}

//! Activity types tracked by the hiscores.
//!
//! Every snapshot carries one entry per known activity type of each
//! category. The order of [`ALL_ACTIVITY_TYPES`] is also the wire index used
//! by the binary codec, so new variants must be appended to their category
//! block and never reordered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category an activity type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityCategory {
    Skill,
    Activity,
    Boss,
    Unknown,
}

macro_rules! activity_types {
    (
        skills { $($skill:ident => ($skill_wire:literal, $skill_name:literal)),* $(,)? }
        activities { $($act:ident => ($act_wire:literal, $act_name:literal)),* $(,)? }
        bosses { $($boss:ident => ($boss_wire:literal, $boss_name:literal)),* $(,)? }
    ) => {
        /// A skill, boss, or minigame-style activity.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "String", from = "String")]
        pub enum ActivityType {
            Unknown,
            $($skill,)*
            $($act,)*
            $($boss,)*
        }

        /// All skill activity types, in hiscore order.
        pub const SKILL_ACTIVITY_TYPES: &[ActivityType] = &[$(ActivityType::$skill,)*];

        /// All minigame-style activity types, in hiscore order.
        pub const ACTIVITY_ACTIVITY_TYPES: &[ActivityType] = &[$(ActivityType::$act,)*];

        /// All boss activity types, in hiscore order.
        pub const BOSS_ACTIVITY_TYPES: &[ActivityType] = &[$(ActivityType::$boss,)*];

        /// Every activity type including `Unknown`. Position is the wire index.
        pub const ALL_ACTIVITY_TYPES: &[ActivityType] = &[
            ActivityType::Unknown,
            $(ActivityType::$skill,)*
            $(ActivityType::$act,)*
            $(ActivityType::$boss,)*
        ];

        impl ActivityType {
            /// Stable upper-case identifier used in storage and JSON.
            pub fn as_str(&self) -> &'static str {
                match self {
                    ActivityType::Unknown => "UNKNOWN",
                    $(ActivityType::$skill => $skill_wire,)*
                    $(ActivityType::$act => $act_wire,)*
                    $(ActivityType::$boss => $boss_wire,)*
                }
            }

            /// Human-readable name.
            pub fn display_name(&self) -> &'static str {
                match self {
                    ActivityType::Unknown => "Unknown",
                    $(ActivityType::$skill => $skill_name,)*
                    $(ActivityType::$act => $act_name,)*
                    $(ActivityType::$boss => $boss_name,)*
                }
            }

            pub fn category(&self) -> ActivityCategory {
                match self {
                    ActivityType::Unknown => ActivityCategory::Unknown,
                    $(ActivityType::$skill => ActivityCategory::Skill,)*
                    $(ActivityType::$act => ActivityCategory::Activity,)*
                    $(ActivityType::$boss => ActivityCategory::Boss,)*
                }
            }
        }
    };
}

activity_types! {
    skills {
        Overall => ("OVERALL", "Overall"),
        Attack => ("ATTACK", "Attack"),
        Defence => ("DEFENCE", "Defence"),
        Strength => ("STRENGTH", "Strength"),
        Hitpoints => ("HITPOINTS", "Hitpoints"),
        Ranged => ("RANGED", "Ranged"),
        Prayer => ("PRAYER", "Prayer"),
        Magic => ("MAGIC", "Magic"),
        Cooking => ("COOKING", "Cooking"),
        Woodcutting => ("WOODCUTTING", "Woodcutting"),
        Fletching => ("FLETCHING", "Fletching"),
        Fishing => ("FISHING", "Fishing"),
        Firemaking => ("FIREMAKING", "Firemaking"),
        Crafting => ("CRAFTING", "Crafting"),
        Smithing => ("SMITHING", "Smithing"),
        Mining => ("MINING", "Mining"),
        Herblore => ("HERBLORE", "Herblore"),
        Agility => ("AGILITY", "Agility"),
        Thieving => ("THIEVING", "Thieving"),
        Slayer => ("SLAYER", "Slayer"),
        Farming => ("FARMING", "Farming"),
        Runecraft => ("RUNECRAFT", "Runecraft"),
        Hunter => ("HUNTER", "Hunter"),
        Construction => ("CONSTRUCTION", "Construction"),
    }
    activities {
        LeaguePoints => ("LEAGUE_POINTS", "League Points"),
        DeadmanPoints => ("DEADMAN_POINTS", "Deadman Points"),
        BountyHunterHunter => ("BOUNTY_HUNTER__HUNTER", "Bounty Hunter - Hunter"),
        BountyHunterRogue => ("BOUNTY_HUNTER__ROGUE", "Bounty Hunter - Rogue"),
        BountyHunterLegacyHunter => ("BOUNTY_HUNTER_LEGACY__HUNTER", "Bounty Hunter (Legacy) - Hunter"),
        BountyHunterLegacyRogue => ("BOUNTY_HUNTER_LEGACY__ROGUE", "Bounty Hunter (Legacy) - Rogue"),
        ClueScrollsAll => ("CLUE_SCROLLS_ALL", "Clue Scrolls (all)"),
        ClueScrollsBeginner => ("CLUE_SCROLLS_BEGINNER", "Clue Scrolls (beginner)"),
        ClueScrollsEasy => ("CLUE_SCROLLS_EASY", "Clue Scrolls (easy)"),
        ClueScrollsMedium => ("CLUE_SCROLLS_MEDIUM", "Clue Scrolls (medium)"),
        ClueScrollsHard => ("CLUE_SCROLLS_HARD", "Clue Scrolls (hard)"),
        ClueScrollsElite => ("CLUE_SCROLLS_ELITE", "Clue Scrolls (elite)"),
        ClueScrollsMaster => ("CLUE_SCROLLS_MASTER", "Clue Scrolls (master)"),
        LmsRank => ("LMS__RANK", "LMS - Rank"),
        PvpArenaRank => ("PVP_ARENA__RANK", "PvP Arena - Rank"),
        SoulWarsZeal => ("SOUL_WARS_ZEAL", "Soul Wars Zeal"),
        RiftsClosed => ("RIFTS_CLOSED", "Rifts closed"),
        ColosseumGlory => ("COLOSSEUM_GLORY", "Colosseum Glory"),
        CollectionsLogged => ("COLLECTIONS_LOGGED", "Collections Logged"),
    }
    bosses {
        AbyssalSire => ("ABYSSAL_SIRE", "Abyssal Sire"),
        AlchemicalHydra => ("ALCHEMICAL_HYDRA", "Alchemical Hydra"),
        Amoxliatl => ("AMOXLIATL", "Amoxliatl"),
        Araxxor => ("ARAXXOR", "Araxxor"),
        Artio => ("ARTIO", "Artio"),
        BarrowsChests => ("BARROWS_CHESTS", "Barrows Chests"),
        Bryophyta => ("BRYOPHYTA", "Bryophyta"),
        Callisto => ("CALLISTO", "Callisto"),
        Calvarion => ("CALVARION", "Calvar'ion"),
        Cerberus => ("CERBERUS", "Cerberus"),
        ChambersOfXeric => ("CHAMBERS_OF_XERIC", "Chambers of Xeric"),
        ChambersOfXericChallengeMode => ("CHAMBERS_OF_XERIC_CHALLENGE_MODE", "Chambers of Xeric: Challenge Mode"),
        ChaosElemental => ("CHAOS_ELEMENTAL", "Chaos Elemental"),
        ChaosFanatic => ("CHAOS_FANATIC", "Chaos Fanatic"),
        CommanderZilyana => ("COMMANDER_ZILYANA", "Commander Zilyana"),
        CorporealBeast => ("CORPOREAL_BEAST", "Corporeal Beast"),
        CrazyArchaeologist => ("CRAZY_ARCHAEOLOGIST", "Crazy Archaeologist"),
        DagannothPrime => ("DAGANNOTH_PRIME", "Dagannoth Prime"),
        DagannothRex => ("DAGANNOTH_REX", "Dagannoth Rex"),
        DagannothSupreme => ("DAGANNOTH_SUPREME", "Dagannoth Supreme"),
        DerangedArchaeologist => ("DERANGED_ARCHAEOLOGIST", "Deranged Archaeologist"),
        DukeSucellus => ("DUKE_SUCELLUS", "Duke Sucellus"),
        GeneralGraardor => ("GENERAL_GRAARDOR", "General Graardor"),
        GiantMole => ("GIANT_MOLE", "Giant Mole"),
        GrotesqueGuardians => ("GROTESQUE_GUARDIANS", "Grotesque Guardians"),
        Hespori => ("HESPORI", "Hespori"),
        KalphiteQueen => ("KALPHITE_QUEEN", "Kalphite Queen"),
        KingBlackDragon => ("KING_BLACK_DRAGON", "King Black Dragon"),
        Kraken => ("KRAKEN", "Kraken"),
        KreeArra => ("KREEARRA", "Kree'Arra"),
        KrilTsutsaroth => ("KRIL_TSUTSAROTH", "K'ril Tsutsaroth"),
        LunarChests => ("LUNAR_CHESTS", "Lunar Chests"),
        Mimic => ("MIMIC", "Mimic"),
        Nex => ("NEX", "Nex"),
        Nightmare => ("NIGHTMARE", "Nightmare"),
        PhosanisNightmare => ("PHOSANIS_NIGHTMARE", "Phosani's Nightmare"),
        Obor => ("OBOR", "Obor"),
        PhantomMuspah => ("PHANTOM_MUSPAH", "Phantom Muspah"),
        Sarachnis => ("SARACHNIS", "Sarachnis"),
        Scorpia => ("SCORPIA", "Scorpia"),
        Scurrius => ("SCURRIUS", "Scurrius"),
        Skotizo => ("SKOTIZO", "Skotizo"),
        SolHeredit => ("SOL_HEREDIT", "Sol Heredit"),
        Spindel => ("SPINDEL", "Spindel"),
        Tempoross => ("TEMPOROSS", "Tempoross"),
        TheGauntlet => ("THE_GAUNTLET", "The Gauntlet"),
        TheCorruptedGauntlet => ("THE_CORRUPTED_GAUNTLET", "The Corrupted Gauntlet"),
        TheHueycoatl => ("THE_HUEYCOATL", "The Hueycoatl"),
        TheLeviathan => ("THE_LEVIATHAN", "The Leviathan"),
        TheRoyalTitans => ("THE_ROYAL_TITANS", "The Royal Titans"),
        TheWhisperer => ("THE_WHISPERER", "The Whisperer"),
        TheatreOfBlood => ("THEATRE_OF_BLOOD", "Theatre of Blood"),
        TheatreOfBloodHardMode => ("THEATRE_OF_BLOOD_HARD_MODE", "Theatre of Blood: Hard Mode"),
        ThermonuclearSmokeDevil => ("THERMONUCLEAR_SMOKE_DEVIL", "Thermonuclear Smoke Devil"),
        TombsOfAmascut => ("TOMBS_OF_AMASCUT", "Tombs of Amascut"),
        TombsOfAmascutExpertMode => ("TOMBS_OF_AMASCUT_EXPERT_MODE", "Tombs of Amascut: Expert Mode"),
        TzKalZuk => ("TZKALZUK", "TzKal-Zuk"),
        TzTokJad => ("TZTOKJAD", "TzTok-Jad"),
        Vardorvis => ("VARDORVIS", "Vardorvis"),
        Venenatis => ("VENENATIS", "Venenatis"),
        Vetion => ("VETION", "Vet'ion"),
        Vorkath => ("VORKATH", "Vorkath"),
        Wintertodt => ("WINTERTODT", "Wintertodt"),
        Yama => ("YAMA", "Yama"),
        Zalcano => ("ZALCANO", "Zalcano"),
        Zulrah => ("ZULRAH", "Zulrah"),
    }
}

impl ActivityType {
    /// Parses a stored identifier. Unrecognised values map to `Unknown`.
    pub fn from_value(value: &str) -> Self {
        ALL_ACTIVITY_TYPES
            .iter()
            .copied()
            .find(|at| at.as_str() == value)
            .unwrap_or(ActivityType::Unknown)
    }

    /// Single-byte wire index (position in [`ALL_ACTIVITY_TYPES`]).
    pub fn index(&self) -> u8 {
        ALL_ACTIVITY_TYPES
            .iter()
            .position(|at| at == self)
            .and_then(|i| u8::try_from(i).ok())
            .unwrap_or(0)
    }

    /// Inverse of [`ActivityType::index`].
    pub fn from_index(index: u8) -> Self {
        ALL_ACTIVITY_TYPES
            .get(index as usize)
            .copied()
            .unwrap_or(ActivityType::Unknown)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        ActivityType::from_value(&value)
    }
}

//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - deck / card: manage the collection
//! - next / preview / grade / undo / defer: study
//! - summary / activity: reporting

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use reviewr::domain::Rating;
use reviewr::scheduler::{MAX_ACTIVITY_DAYS, Scope};

/// Reviewr - spaced-repetition scheduling from the command line
#[derive(Parser, Debug)]
#[command(name = "reviewr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Restrict a command to a deck subtree or a tag.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ScopeArgs {
    /// Deck ID (includes sub-decks)
    #[arg(short, long, conflicts_with = "tag")]
    pub deck: Option<String>,

    /// Tag name
    #[arg(short, long)]
    pub tag: Option<String>,
}

impl ScopeArgs {
    pub fn scope(&self) -> Scope {
        match (&self.deck, &self.tag) {
            (Some(deck), _) => Scope::Deck(deck.clone()),
            (None, Some(tag)) => Scope::Tag(tag.clone()),
            (None, None) => Scope::All,
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deck management
    Deck {
        #[command(subcommand)]
        command: DeckCommands,
    },

    /// Card management
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Show the next card to study
    Next {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Study ahead when nothing is due
        #[arg(short, long)]
        ahead: bool,
    },

    /// Preview the due date of every rating for a card
    Preview {
        /// Card ID
        card_id: String,
    },

    /// Grade a card
    Grade {
        /// Card ID
        card_id: String,

        /// Rating: 0-3 or again/hard/good/easy
        #[arg(value_parser = parse_rating)]
        rating: Rating,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Undo the most recent grade in the current scope
    Undo {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Push a card out by a number of days
    Defer {
        /// Card ID
        card_id: String,

        /// Days to defer by
        days: u32,
    },

    /// Show today's new/review/due counts
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Show reviews and due cards per study day
    Activity {
        /// Number of days to show, starting today
        #[arg(
            short = 'n',
            long,
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_ACTIVITY_DAYS))
        )]
        days: u32,
    },
}

/// Deck subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum DeckCommands {
    /// Create a deck
    Add {
        /// Deck name
        name: String,

        /// Parent deck ID
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List decks
    List,
}

/// Card subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CardCommands {
    /// Create a card
    Add {
        /// Deck ID
        deck: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Sibling key shared by cards of the same note
        #[arg(short, long)]
        sibling: Option<String>,
    },

    /// List cards with their scheduling state
    List {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Delete a card with its state and review log
    Delete {
        /// Card ID
        card_id: String,
    },
}

fn parse_rating(value: &str) -> Result<Rating, String> {
    value.parse::<Rating>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_requires_subcommand() {
        assert!(Cli::try_parse_from(["reviewr"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["reviewr", "summary", "--json", "-v", "-c", "/tmp/r.yml"]).unwrap();
        assert!(cli.json);
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.yml")));
    }

    #[test]
    fn test_grade_by_number_and_name() {
        let cli = Cli::try_parse_from(["reviewr", "grade", "card-1", "2"]).unwrap();
        match cli.command {
            Commands::Grade { card_id, rating, scope } => {
                assert_eq!(card_id, "card-1");
                assert_eq!(rating, Rating::Good);
                assert_eq!(scope.scope(), Scope::All);
            }
            _ => panic!("Expected grade command"),
        }

        let cli = Cli::try_parse_from(["reviewr", "grade", "card-1", "Easy", "--deck", "d1"]).unwrap();
        match cli.command {
            Commands::Grade { rating, scope, .. } => {
                assert_eq!(rating, Rating::Easy);
                assert_eq!(scope.scope(), Scope::Deck("d1".to_string()));
            }
            _ => panic!("Expected grade command"),
        }
    }

    #[test]
    fn test_grade_rejects_bad_rating() {
        assert!(Cli::try_parse_from(["reviewr", "grade", "card-1", "4"]).is_err());
        assert!(Cli::try_parse_from(["reviewr", "grade", "card-1", "perfect"]).is_err());
    }

    #[test]
    fn test_scope_flags_conflict() {
        assert!(Cli::try_parse_from(["reviewr", "next", "--deck", "d1", "--tag", "verbs"]).is_err());

        let cli = Cli::try_parse_from(["reviewr", "next", "--tag", "verbs", "--ahead"]).unwrap();
        match cli.command {
            Commands::Next { scope, ahead } => {
                assert_eq!(scope.scope(), Scope::Tag("verbs".to_string()));
                assert!(ahead);
            }
            _ => panic!("Expected next command"),
        }
    }

    #[test]
    fn test_card_add_with_tags() {
        let cli = Cli::try_parse_from([
            "reviewr", "card", "add", "d1", "--tag", "verbs", "--tag", "irregular", "--sibling", "note-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Card {
                command: CardCommands::Add { deck, tags, sibling },
            } => {
                assert_eq!(deck, "d1");
                assert_eq!(tags, vec!["verbs", "irregular"]);
                assert_eq!(sibling.as_deref(), Some("note-1"));
            }
            _ => panic!("Expected card add command"),
        }
    }

    #[test]
    fn test_deck_add_with_parent() {
        let cli = Cli::try_parse_from(["reviewr", "deck", "add", "Verbs", "-p", "d1"]).unwrap();
        match cli.command {
            Commands::Deck {
                command: DeckCommands::Add { name, parent },
            } => {
                assert_eq!(name, "Verbs");
                assert_eq!(parent.as_deref(), Some("d1"));
            }
            _ => panic!("Expected deck add command"),
        }
    }

    #[test]
    fn test_defer_and_activity() {
        let cli = Cli::try_parse_from(["reviewr", "defer", "card-1", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Defer { ref card_id, days: 3 } if card_id == "card-1"));

        let cli = Cli::try_parse_from(["reviewr", "activity"]).unwrap();
        assert!(matches!(cli.command, Commands::Activity { days: 7 }));
    }

    #[test]
    fn test_activity_days_bounded() {
        let cli = Cli::try_parse_from(["reviewr", "activity", "-n", "3660"]).unwrap();
        assert!(matches!(cli.command, Commands::Activity { days: 3660 }));

        assert!(Cli::try_parse_from(["reviewr", "activity", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["reviewr", "activity", "-n", "3661"]).is_err());
        assert!(Cli::try_parse_from(["reviewr", "activity", "-n", "4000000000"]).is_err());
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}

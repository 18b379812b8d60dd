use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schoolshelf")]
#[command(
    about = "CLI tool for cataloguing a school library, managing classrooms and recording barcode-verified loans"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the library database (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(
        long,
        global = true,
        env = "SCHOOLSHELF_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find, catalogue and browse books
    Books {
        #[command(subcommand)]
        command: BookCommands,
    },

    /// Manage reading levels
    Levels {
        #[command(subcommand)]
        command: LevelCommands,
    },

    /// Import and browse classrooms and their pupils
    Classrooms {
        #[command(subcommand)]
        command: ClassroomCommands,
    },

    /// Manage logins
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Lend and return books
    Loans {
        #[command(subcommand)]
        command: LoanCommands,
    },

    /// Print the ISBN barcodes found in an image
    Scan {
        /// Photo of a barcode (jpg, jpeg, png or bmp)
        image: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum BookCommands {
    /// Look up book details online by ISBN and/or title
    Find {
        /// Candidate ISBN (repeatable; ISBN-10 or ISBN-13)
        #[arg(long = "isbn")]
        isbns: Vec<String>,

        /// Title to search for
        #[arg(long)]
        title: Option<String>,

        /// Only query sources directly by ISBN, skipping related editions
        /// and title discovery
        #[arg(long)]
        direct: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a book online and add it to the catalogue
    Add {
        /// Candidate ISBN (repeatable)
        #[arg(long = "isbn")]
        isbns: Vec<String>,

        /// Title to search for
        #[arg(long)]
        title: Option<String>,

        /// Which result to add (1-based, default: first)
        #[arg(long)]
        pick: Option<usize>,

        /// Only query sources directly by ISBN
        #[arg(long)]
        direct: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List the catalogue a page at a time
    List {
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one book
    Show {
        /// Book id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the catalogue by title, author, category or ISBN
    Search {
        /// Text to search for
        text: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every title, author and category name (search suggestions)
    Terms,

    /// Assign a reading level to a book
    SetLevel {
        /// Book id
        id: i64,

        /// Reading level name
        level: String,
    },
}

#[derive(Subcommand)]
pub enum LevelCommands {
    /// Add a reading level
    Add {
        /// Level name
        level: String,

        /// Youngest suitable age
        #[arg(long)]
        age_min: Option<i64>,

        /// Oldest suitable age
        #[arg(long)]
        age_max: Option<i64>,
    },

    /// List reading levels
    List,
}

#[derive(Subcommand)]
pub enum ClassroomCommands {
    /// Import pupils from a classroom,year,pupil CSV file
    Import {
        /// Roster file (.csv)
        file: PathBuf,
    },

    /// List classrooms
    List,

    /// List the pupils of a classroom
    Pupils {
        /// Classroom name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a login, or reset a classroom's login
    Add {
        /// Username for the new login
        username: String,

        /// Password for the new login (prompted if omitted)
        #[arg(long, env = "SCHOOLSHELF_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,

        /// Link the login to this classroom
        #[arg(long)]
        classroom: Option<String>,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },

    /// List logins
    List,

    /// Show who you are logged in as
    Whoami,
}

#[derive(Subcommand)]
pub enum LoanCommands {
    /// Lend a book to a pupil, verified by a photo of its barcode
    Record {
        /// Book id
        #[arg(long)]
        book: i64,

        /// Pupil id
        #[arg(long)]
        pupil: i64,

        /// Photo of the book's barcode
        #[arg(long)]
        barcode: PathBuf,
    },

    /// Record a book coming back, verified by a photo of its barcode
    Return {
        /// Book id
        #[arg(long)]
        book: i64,

        /// Photo of the book's barcode
        #[arg(long)]
        barcode: PathBuf,
    },

    /// List books currently on loan
    List {
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,
    },
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gradebook", version, about = "Weighted course gradebook")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Database file path (overrides GRADEBOOK_DB)")]
    pub db_path: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    pub log_level: Option<String>,
    #[arg(
        long,
        global = true,
        value_enum,
        help = "What removing a category does with its weight"
    )]
    pub freed_weight: Option<FreedWeight>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    Assignment {
        #[command(subcommand)]
        command: AssignmentCommands,
    },
    /// Show the weighted grade of one course.
    Grade {
        #[command(flatten)]
        course: CourseRef,
    },
    /// Score statistics and letter-band distribution of one course.
    Stats {
        #[command(flatten)]
        course: CourseRef,
    },
    /// Per-course score summary, with term averages across terms.
    Summary {
        #[arg(long, help = "Only courses of this term")]
        term: Option<String>,
    },
    /// Repair category weights of every course.
    NormalizeAll,
    /// List courses whose weights do not sum to 100%.
    Audit,
    /// Write one course report, or every course with `--all`, to files.
    Export {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        code: Option<String>,
        #[arg(long, conflicts_with = "all")]
        term: Option<String>,
        #[arg(long, value_name = "DIR", help = "Export every course into DIR")]
        all: Option<PathBuf>,
        #[arg(long, short, value_enum, default_value_t = ExportFormat::Txt)]
        format: ExportFormat,
        #[arg(
            long,
            short,
            conflicts_with = "all",
            help = "Output file (default: <code>.<format>)"
        )]
        output: Option<PathBuf>,
    },
}

/// Course addressed by code, with a term when the code repeats.
#[derive(Args, Debug, Clone)]
pub struct CourseRef {
    pub code: String,
    #[arg(long)]
    pub term: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        code: String,
        title: String,
        term: String,
        #[arg(long, default_value_t = gradebook_core::model::course::DEFAULT_CREDIT_HOURS)]
        credits: u32,
    },
    List,
    Show {
        #[command(flatten)]
        course: CourseRef,
    },
    Remove {
        #[command(flatten)]
        course: CourseRef,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Replace all categories; weights are fractions summing to 1.
    Set {
        #[command(flatten)]
        course: CourseRef,
        #[arg(required = true, value_parser = parse_category_spec, help = "NAME=WEIGHT, e.g. Exams=0.6")]
        categories: Vec<(String, f64)>,
        #[arg(long, help = "Move existing assignments into the first new category")]
        preserve_assignments: bool,
    },
    /// Add a category funded from Unallocated.
    Add {
        #[command(flatten)]
        course: CourseRef,
        name: String,
        weight: f64,
    },
    Edit {
        #[command(flatten)]
        course: CourseRef,
        name: String,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        new_name: Option<String>,
    },
    Remove {
        #[command(flatten)]
        course: CourseRef,
        name: String,
        #[arg(long, help = "Delete assignments instead of moving them to Unassigned")]
        delete_assignments: bool,
    },
    Normalize {
        #[command(flatten)]
        course: CourseRef,
    },
    List {
        #[command(flatten)]
        course: CourseRef,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssignmentCommands {
    Add {
        #[command(flatten)]
        course: CourseRef,
        category: String,
        title: String,
        max_points: f64,
        earned_points: f64,
    },
    Edit {
        #[command(flatten)]
        course: CourseRef,
        title: String,
        #[arg(long)]
        new_title: Option<String>,
        #[arg(long)]
        earned: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        #[arg(long)]
        category: Option<String>,
    },
    Move {
        #[command(flatten)]
        course: CourseRef,
        title: String,
        category: String,
    },
    Remove {
        #[command(flatten)]
        course: CourseRef,
        title: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FreedWeight {
    Return,
    Drop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
        }
    }
}

fn parse_category_spec(value: &str) -> Result<(String, f64), String> {
    let (name, weight) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=WEIGHT, got `{value}`"))?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid weight in `{value}`: {err}"))?;
    Ok((name.trim().to_string(), weight))
}

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "birthreg",
    about = "Birth record registry on a versioned ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger snapshot file; created on the first write
    #[arg(long, global = true, default_value = "birthreg-ledger.json")]
    pub ledger: PathBuf,

    /// Organization the transactions are submitted on behalf of
    #[arg(long, global = true, default_value = "Org1MSP")]
    pub msp: String,

    /// Registry configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a new birth record
    Create(CreateArgs),
    /// Show a birth record
    Read(ReadArgs),
    /// Replace the medical section of a record
    UpdateMedical(UpdateMedicalArgs),
    /// Show every committed change of a record
    History(HistoryArgs),
    /// Find records with a JSON selector
    Query(QueryArgs),
    /// List committed events
    Events(EventsArgs),
    /// Call a contract operation by name
    Invoke(InvokeArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// Record JSON, or @path to read it from a file
    pub record: String,
}

#[derive(Args)]
pub struct ReadArgs {
    pub record_id: String,
}

#[derive(Args)]
pub struct UpdateMedicalArgs {
    pub record_id: String,
    /// Medical JSON, or @path to read it from a file
    pub medical: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub record_id: String,
}

#[derive(Args)]
pub struct QueryArgs {
    /// e.g. '{"selector":{"contact.city":"Lagos"}}'
    pub selector: String,
}

#[derive(Args)]
pub struct EventsArgs {
    /// Show only the most recent N events
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["birthreg", "create", "@alex.json"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.record, "@alex.json");
        } else { panic!("wrong command"); }
        assert_eq!(cli.msp, "Org1MSP");
        assert_eq!(cli.ledger, PathBuf::from("birthreg-ledger.json"));
    }

    #[test]
    fn parse_update_medical() {
        let cli = Cli::try_parse_from([
            "birthreg", "update-medical", "R1", r#"{"deliveryType":"C-section"}"#,
        ])
        .unwrap();
        if let Command::UpdateMedical(args) = cli.command {
            assert_eq!(args.record_id, "R1");
            assert_eq!(args.medical, r#"{"deliveryType":"C-section"}"#);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_update_medical_requires_both_args() {
        assert!(Cli::try_parse_from(["birthreg", "update-medical", "R1"]).is_err());
    }

    #[test]
    fn parse_events_limit() {
        let cli = Cli::try_parse_from(["birthreg", "events", "-n", "3"]).unwrap();
        if let Command::Events(args) = cli.command {
            assert_eq!(args.limit, Some(3));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_invoke_with_args() {
        let cli = Cli::try_parse_from(["birthreg", "invoke", "ReadBirthRecord", "R1"]).unwrap();
        if let Command::Invoke(args) = cli.command {
            assert_eq!(args.function, "ReadBirthRecord");
            assert_eq!(args.args, vec!["R1"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "birthreg", "read", "R1", "--ledger", "/tmp/l.json", "--msp", "ClinicMSP", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.ledger, PathBuf::from("/tmp/l.json"));
        assert_eq!(cli.msp, "ClinicMSP");
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["birthreg", "--format", "json", "history", "R1"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}

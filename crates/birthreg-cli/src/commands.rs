use std::path::{Path, PathBuf};

use anyhow::Context;
use birthreg_ledger::{CommitReceipt, InMemoryLedger, LedgerSnapshot};
use birthreg_registry::{BirthRecord, BirthRecordContract, HistoryEntry, RegistryConfig};
use birthreg_types::LedgerTimestamp;
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::*;

/// Ledger, contract, and output settings shared by every command.
struct Session {
    ledger: InMemoryLedger,
    ledger_path: PathBuf,
    contract: BirthRecordContract,
    msp: String,
    format: OutputFormat,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    let session = Session {
        ledger: load_ledger(&cli.ledger)?,
        ledger_path: cli.ledger,
        contract: BirthRecordContract::new(config),
        msp: cli.msp,
        format: cli.format,
    };
    match cli.command {
        Command::Create(args) => cmd_create(&session, args),
        Command::Read(args) => cmd_read(&session, args),
        Command::UpdateMedical(args) => cmd_update_medical(&session, args),
        Command::History(args) => cmd_history(&session, args),
        Command::Query(args) => cmd_query(&session, args),
        Command::Events(args) => cmd_events(&session, args),
        Command::Invoke(args) => cmd_invoke(&session, args),
    }
}

fn load_ledger(path: &Path) -> anyhow::Result<InMemoryLedger> {
    if !path.exists() {
        debug!(path = %path.display(), "no ledger snapshot; starting empty");
        return Ok(InMemoryLedger::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading ledger {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("parsing ledger {}", path.display()))?;
    Ok(InMemoryLedger::from_snapshot(snapshot))
}

impl Session {
    fn save(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.ledger.snapshot())?;
        std::fs::write(&self.ledger_path, text)
            .with_context(|| format!("writing ledger {}", self.ledger_path.display()))?;
        info!(path = %self.ledger_path.display(), height = self.ledger.height(), "ledger saved");
        Ok(())
    }

    /// Save the ledger if the commit changed it.
    fn persist(&self, receipt: &CommitReceipt) -> anyhow::Result<()> {
        if receipt.writes > 0 || receipt.event.is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Inline JSON, or `@path` for a file's contents.
fn read_input(arg: &str) -> anyhow::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => Ok(arg.to_string()),
    }
}

fn cmd_create(s: &Session, args: CreateArgs) -> anyhow::Result<()> {
    let record = read_input(&args.record)?;
    let tx = s.ledger.begin(s.msp.clone());
    s.contract.create_birth_record(&tx, &record)?;
    let receipt = tx.commit()?;
    s.persist(&receipt)?;
    print_receipt(s, "Birth record created", &receipt);
    Ok(())
}

fn cmd_read(s: &Session, args: ReadArgs) -> anyhow::Result<()> {
    let tx = s.ledger.begin(s.msp.clone());
    let record = s.contract.read_birth_record(&tx, &args.record_id)?;
    if s.json() {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

fn cmd_update_medical(s: &Session, args: UpdateMedicalArgs) -> anyhow::Result<()> {
    let medical = read_input(&args.medical)?;
    let tx = s.ledger.begin(s.msp.clone());
    s.contract
        .update_medical_info(&tx, &args.record_id, &medical)?;
    let receipt = tx.commit()?;
    s.persist(&receipt)?;
    print_receipt(s, "Medical info updated", &receipt);
    Ok(())
}

fn cmd_history(s: &Session, args: HistoryArgs) -> anyhow::Result<()> {
    let tx = s.ledger.begin(s.msp.clone());
    let rendered = s.contract.get_history_for_record(&tx, &args.record_id)?;
    if s.json() {
        println!("{rendered}");
        return Ok(());
    }
    let entries: Vec<HistoryEntry> = serde_json::from_str(&rendered)?;
    if entries.is_empty() {
        println!("No history for {}.", args.record_id.bold());
    }
    for (i, entry) in entries.iter().enumerate() {
        let marker = if entry.is_delete { "deleted".red() } else { "written".green() };
        println!("{} {}  {}  {}", format!("#{}", i + 1).yellow(), entry.timestamp, entry.tx_id.dimmed(), marker);
        println!("  {}", entry.value.get());
    }
    Ok(())
}

fn cmd_query(s: &Session, args: QueryArgs) -> anyhow::Result<()> {
    let selector = read_input(&args.selector)?;
    let tx = s.ledger.begin(s.msp.clone());
    let records = s.contract.query_records_by_attribute(&tx, &selector)?;
    if s.json() {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No matching records.");
    }
    for record in &records {
        println!(
            "{}  {} {}  {}",
            record.record_id.yellow().bold(),
            record.child.first_name,
            record.child.last_name,
            record.contact.city.dimmed()
        );
    }
    Ok(())
}

fn cmd_events(s: &Session, args: EventsArgs) -> anyhow::Result<()> {
    let events = s.ledger.events();
    let skip = args.limit.map_or(0, |n| events.len().saturating_sub(n));
    let shown = &events[skip..];
    if s.json() {
        let rendered: Vec<_> = shown
            .iter()
            .map(|e| {
                json!({
                    "txId": e.tx_id,
                    "name": e.name,
                    "payload": String::from_utf8_lossy(&e.payload),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }
    if shown.is_empty() {
        println!("No events.");
    }
    for event in shown {
        println!("{}  {}  ({} bytes)", event.name.cyan(), event.tx_id.dimmed(), event.payload.len());
    }
    Ok(())
}

fn cmd_invoke(s: &Session, args: InvokeArgs) -> anyhow::Result<()> {
    let inputs = args
        .args
        .iter()
        .map(|a| read_input(a))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();

    let tx = s.ledger.begin(s.msp.clone());
    let response = s.contract.invoke(&tx, &args.function, &inputs)?;
    let receipt = tx.commit()?;
    s.persist(&receipt)?;
    println!("{}", String::from_utf8_lossy(&response));
    Ok(())
}

fn print_receipt(s: &Session, what: &str, receipt: &CommitReceipt) {
    if s.json() {
        println!(
            "{}",
            json!({ "txId": receipt.tx_id, "height": receipt.height, "event": receipt.event })
        );
        return;
    }
    println!("{} {}", "✓".green().bold(), what);
    println!("  Transaction: {}", receipt.tx_id.yellow());
    println!("  Height: {}", receipt.height);
    if let Some(event) = &receipt.event {
        println!("  Event: {}", event.cyan());
    }
}

fn print_record(record: &BirthRecord) {
    let child = &record.child;
    let parents = &record.parents;
    let created = i64::try_from(record.created_at)
        .ok()
        .and_then(|secs| LedgerTimestamp::new(secs, 0).to_rfc3339().ok())
        .unwrap_or_else(|| record.created_at.to_string());

    println!("Birth record {}", record.record_id.yellow().bold());
    println!(
        "  Child: {} {} {} ({}, {} g)",
        child.first_name, child.middle_name, child.last_name, child.gender, child.weight_grams
    );
    println!("  Born: {} {}", child.date_of_birth, child.time_of_birth);
    println!(
        "  Mother: {} {}  Father: {} {}",
        parents.mother_first_name, parents.mother_last_name, parents.father_first_name, parents.father_last_name
    );
    println!("  City: {}", record.contact.city);
    println!("  Delivery: {}", record.medical.delivery_type.cyan());
    println!("  Created by {} at {}", record.created_by.bold(), created);
}

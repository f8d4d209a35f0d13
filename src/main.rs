use anyhow::{Result, bail};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cynosure::catalog::EventQuery;
use cynosure::config::Config;
use cynosure::export::calendar_file_name;
use cynosure::messaging::{FeedFilter, OutgoingMessage};
use cynosure::portal::{Identity, Portal};
use cynosure::registrations::{RegistrationInput, SubcategoryFilter};
use cynosure::schedule::{FestivalDay, Reminder};
use cynosure::store::{JsonFileBackend, Message};
use prettytable::{Table, row};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "cynosure")]
#[command(about = "Cynosure festival event portal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the event catalog
    Events {
        #[command(subcommand)]
        events_command: EventsCommands,
    },
    /// Log in and record presence
    Login {
        #[command(subcommand)]
        login_command: LoginCommands,
    },
    /// Greeting, registered events and reminders for a participant
    Dashboard {
        /// Participant name
        #[arg(long)]
        name: String,
    },
    /// Event rosters
    Roster {
        #[command(subcommand)]
        roster_command: RosterCommands,
    },
    /// Participant and admin messages
    Messages {
        #[command(subcommand)]
        messages_command: MessagesCommands,
    },
    /// Users seen within the presence window
    Online {
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Mark an event as completed for a participant
    Complete {
        /// Participant name
        #[arg(long)]
        name: String,
        /// Event name (fuzzy matched)
        #[arg(long)]
        event: String,
        /// Participant confirmed they are at the venue
        #[arg(long)]
        at_venue: bool,
    },
    /// Export registrations as CSV
    Export {
        #[command(subcommand)]
        export_command: ExportCommands,
    },
    /// Add a demo participant when the store is empty
    Seed,
}

#[derive(Subcommand)]
enum EventsCommands {
    /// List all events with their status
    List,
    /// Show one event card
    Show {
        /// Event name (fuzzy matched)
        event: String,
        /// Sub-category filter for the roster
        #[arg(long)]
        subcat: Option<String>,
    },
    /// Keyword search with optional filters
    Search {
        /// Keywords; all must match
        #[arg(default_value = "")]
        text: String,
        /// Category filter
        #[arg(long)]
        category: Option<String>,
        /// Festival day filter
        #[arg(long, value_enum)]
        day: Option<DayArg>,
    },
    /// Distinct event categories
    Categories,
    /// All events in start order
    Timeline,
    /// Write an iCalendar file for an event
    Ics {
        /// Event name (fuzzy matched)
        event: String,
        /// Output path (defaults to "<event>.ics")
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LoginCommands {
    /// Participant login; the name must already be registered
    Participant {
        #[arg(long)]
        name: String,
    },
    /// Admin login
    Admin {
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(Subcommand)]
enum RosterCommands {
    /// List participants of an event
    List {
        /// Event name (fuzzy matched)
        event: String,
        /// Sub-category filter
        #[arg(long)]
        subcat: Option<String>,
    },
    /// Find registrations whose participant name contains the text
    Search {
        /// Name fragment
        fragment: String,
    },
    /// Add or update a registration
    Add {
        /// Event name (fuzzy matched)
        event: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Grade and division, e.g. "10 B"
        #[arg(long, default_value = "")]
        grade: String,
        /// Sub-category; defaults to the event's first category
        #[arg(long)]
        subcat: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Remove a registration
    Remove {
        /// Event name (fuzzy matched)
        event: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        subcat: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(Subcommand)]
enum MessagesCommands {
    /// Participant writes to the admins about an event
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        text: String,
    },
    /// Admin replies to a participant
    Reply {
        #[arg(long)]
        to: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        text: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Conversation between a participant and the admins for one event
    Thread {
        #[arg(long)]
        event: String,
        #[arg(long)]
        name: String,
    },
    /// Every message involving a participant
    Inbox {
        #[arg(long)]
        name: String,
    },
    /// All messages, newest first
    Feed {
        /// Participant name filter (substring)
        #[arg(long)]
        participant: Option<String>,
        /// Event name filter (substring)
        #[arg(long)]
        event: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// event,name,phone,email,grade,subcat
    Raw {
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Festival office report layout
    Report {
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(Args)]
struct AdminArgs {
    /// Admin display name
    #[arg(long = "admin")]
    admin_name: String,
    /// Admin password
    #[arg(long)]
    password: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum DayArg {
    One,
    Two,
}

impl From<DayArg> for FestivalDay {
    fn from(day: DayArg) -> Self {
        match day {
            DayArg::One => FestivalDay::One,
            DayArg::Two => FestivalDay::Two,
        }
    }
}

type AppPortal = Portal<JsonFileBackend>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_logged(io::stderr)?;
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .with_writer(io::stderr)
        .init();

    let portal = Portal::open(config)?;
    info!(
        "Loaded {} events from {}",
        portal.catalog().len(),
        portal.config().paths.catalog.display()
    );
    let now = Local::now().naive_local();

    match cli.command {
        Commands::Events { events_command } => match events_command {
            EventsCommands::List => list_events(&portal, now),
            EventsCommands::Show { event, subcat } => show_event(&portal, &event, subcat, now)?,
            EventsCommands::Search {
                text,
                category,
                day,
            } => search_events(&portal, text, category, day),
            EventsCommands::Categories => {
                for category in portal.catalog().categories() {
                    println!("{}", category);
                }
            }
            EventsCommands::Timeline => timeline(&portal, now),
            EventsCommands::Ics { event, out } => write_ics(&portal, &event, out)?,
        },
        Commands::Login { login_command } => {
            let identity = match login_command {
                LoginCommands::Participant { name } => portal.login_participant(&name, now)?,
                LoginCommands::Admin { admin } => admin_login(&portal, &admin, now)?,
            };
            let role = if identity.is_admin() { "admin" } else { "participant" };
            println!("Welcome {} ({})", identity.name(), role);
        }
        Commands::Dashboard { name } => dashboard(&portal, &name, now)?,
        Commands::Roster { roster_command } => roster(&portal, roster_command, now)?,
        Commands::Messages { messages_command } => messages(&portal, messages_command, now)?,
        Commands::Online { admin } => {
            admin_login(&portal, &admin, now)?;
            let mut table = Table::new();
            table.add_row(row!["Name", "Role", "Last seen"]);
            for s in portal.store().online(now, portal.online_window())? {
                let seen = s
                    .last_seen
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                table.add_row(row![s.name, s.role, seen]);
            }
            table.printstd();
        }
        Commands::Complete {
            name,
            event,
            at_venue,
        } => {
            portal.login_participant(&name, now)?;
            let ev = portal.catalog().resolve(&event)?;
            let schedule = portal.calendar().resolve_event(ev);
            if !schedule.completion_window_open(now) {
                bail!(
                    "{} can only be marked completed once it has started ({})",
                    ev.name,
                    schedule.status(now)
                );
            }
            let done = portal
                .store()
                .mark_completed(&ev.name, &name, at_venue, now)?;
            println!(
                "Marked {} completed for {} at {}",
                done.event,
                done.name,
                done.timestamp.format("%H:%M")
            );
        }
        Commands::Export { export_command } => match export_command {
            ExportCommands::Raw { out, admin } => {
                admin_login(&portal, &admin, now)?;
                match out {
                    Some(path) => portal.export_raw(File::create(&path)?)?,
                    None => portal.export_raw(io::stdout())?,
                }
            }
            ExportCommands::Report { out, admin } => {
                admin_login(&portal, &admin, now)?;
                match out {
                    Some(path) => portal.export_report(File::create(&path)?)?,
                    None => portal.export_report(io::stdout())?,
                }
            }
        },
        Commands::Seed => {
            if portal.store().seed_demo(portal.catalog())? {
                println!("Seeded demo participant");
            } else {
                println!("Store already has participants; nothing seeded");
            }
        }
    }

    Ok(())
}

fn admin_login(portal: &AppPortal, admin: &AdminArgs, now: NaiveDateTime) -> Result<Identity> {
    Ok(portal.login_admin(&admin.password, &admin.admin_name, now)?)
}

fn subcat_filter(subcat: Option<String>) -> SubcategoryFilter {
    match subcat {
        Some(sc) if !sc.trim().is_empty() => SubcategoryFilter::Only(sc),
        _ => SubcategoryFilter::All,
    }
}

fn list_events(portal: &AppPortal, now: NaiveDateTime) {
    let mut table = Table::new();
    table.add_row(row!["Event", "Category", "Date", "Time", "Venue", "Status"]);
    for ev in portal.catalog().events() {
        let status = portal.calendar().resolve_event(ev).status(now);
        table.add_row(row![
            ev.name,
            ev.category,
            ev.date_text(),
            ev.time,
            ev.venue,
            status
        ]);
    }
    table.printstd();
}

fn search_events(
    portal: &AppPortal,
    text: String,
    category: Option<String>,
    day: Option<DayArg>,
) {
    let query = EventQuery {
        text,
        category,
        day: day.map(FestivalDay::from),
    };
    let hits = portal.catalog().search(&query, portal.calendar());
    if hits.is_empty() {
        println!("No events match.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Event", "Category", "Age", "Date", "Venue"]);
    for ev in hits {
        table.add_row(row![
            ev.name,
            ev.category,
            ev.age_category,
            ev.date_text(),
            ev.venue
        ]);
    }
    table.printstd();
}

fn timeline(portal: &AppPortal, now: NaiveDateTime) {
    let mut table = Table::new();
    table.add_row(row!["Start", "End", "Event", "Venue", "Status"]);
    for (sched, ev) in portal.calendar().timeline(portal.catalog().events()) {
        let fmt = |t: Option<NaiveDateTime>| {
            t.map(|t| t.format("%a %H:%M").to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        table.add_row(row![
            fmt(sched.start),
            fmt(sched.end),
            ev.name,
            ev.venue,
            sched.status(now)
        ]);
    }
    table.printstd();
}

fn show_event(
    portal: &AppPortal,
    name: &str,
    subcat: Option<String>,
    now: NaiveDateTime,
) -> Result<()> {
    let ev = portal.catalog().resolve(name)?;
    let card = portal.event_card(ev, &subcat_filter(subcat), now)?;

    println!("{}", card.event.name);
    println!("  Category:  {}", card.event.category);
    println!("  Age:       {}", card.event.age_category);
    println!("  Date:      {}", card.event.date_text());
    println!("  Time:      {}", card.event.time);
    println!("  Venue:     {}", card.event.venue);
    println!("  Teacher:   {}", card.event.teacher_in_charge);
    println!("  Status:    {}", card.status);
    if !card.subcategories.is_empty() {
        println!("  Sub-categories: {}", card.subcategories.join(", "));
    }

    if card.roster.is_empty() {
        println!("\nNo participants registered.");
        return Ok(());
    }
    let mut table = Table::new();
    table.add_row(row!["Name", "Grade", "Sub-category", "Phone", "Last message"]);
    for line in card.roster {
        let r = line.registration;
        table.add_row(row![
            r.name,
            r.grade,
            r.subcat,
            r.phone,
            line.last_message.unwrap_or_default()
        ]);
    }
    table.printstd();
    Ok(())
}

fn write_ics(portal: &AppPortal, name: &str, out: Option<PathBuf>) -> Result<()> {
    let ev = portal.catalog().resolve(name)?;
    let path = out.unwrap_or_else(|| PathBuf::from(calendar_file_name(ev)));
    std::fs::write(&path, portal.calendar_file(ev))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn dashboard(portal: &AppPortal, name: &str, now: NaiveDateTime) -> Result<()> {
    let identity = portal.login_participant(name, now)?;
    match portal.greeting(identity.name(), now)? {
        Some(greeting) => println!("{}", greeting),
        None => println!("Hello {}.", identity.name()),
    }

    let events = portal.my_events(identity.name())?;
    if events.is_empty() {
        println!("You are not registered for any event yet.");
        return Ok(());
    }
    let mut table = Table::new();
    table.add_row(row!["Event", "Date", "Time", "Venue", "Status"]);
    for ev in &events {
        let sched = portal.calendar().resolve_event(ev);
        table.add_row(row![
            ev.name,
            ev.date_text(),
            ev.time,
            ev.venue,
            sched.status(now)
        ]);
        match sched.reminder(now) {
            Some(Reminder::HeadToVenue) => {
                println!("Reminder: head to {} now, {} starts soon.", ev.venue, ev.name)
            }
            Some(Reminder::StartingSoon) => {
                println!("Reminder: {} starts within 30 minutes.", ev.name)
            }
            None => {}
        }
    }
    table.printstd();

    let inbox = portal.store().inbox(identity.name())?;
    if !inbox.is_empty() {
        println!("\n{} message(s):", inbox.len());
        print_messages(&inbox);
    }
    Ok(())
}

fn roster(portal: &AppPortal, command: RosterCommands, now: NaiveDateTime) -> Result<()> {
    match command {
        RosterCommands::List { event, subcat } => {
            let ev = portal.catalog().resolve(&event)?;
            let rows = portal
                .store()
                .list_by_event(&ev.name, &subcat_filter(subcat))?;
            let mut table = Table::new();
            table.add_row(row!["Name", "Grade", "Sub-category", "Phone", "Email"]);
            for r in rows {
                table.add_row(row![r.name, r.grade, r.subcat, r.phone, r.email]);
            }
            table.printstd();
        }
        RosterCommands::Search { fragment } => {
            let rows = portal.store().search_by_name(&fragment)?;
            if rows.is_empty() {
                println!("No participants match '{}'.", fragment.trim());
                return Ok(());
            }
            let mut table = Table::new();
            table.add_row(row!["Name", "Event", "Sub-category", "Grade", "Phone"]);
            for r in rows {
                table.add_row(row![r.name, r.event, r.subcat, r.grade, r.phone]);
            }
            table.printstd();
        }
        RosterCommands::Add {
            event,
            name,
            phone,
            email,
            grade,
            subcat,
            admin,
        } => {
            admin_login(portal, &admin, now)?;
            let ev = portal.catalog().resolve(&event)?;
            let subcat = match subcat {
                Some(sc) => sc,
                None => portal.default_subcategory(ev, &SubcategoryFilter::All),
            };
            let input = RegistrationInput {
                name,
                phone,
                email,
                grade,
                subcat,
            };
            let record = portal.store().upsert_registration(&ev.name, &input)?;
            println!("Registered {} for {}", record.name, record.event);
        }
        RosterCommands::Remove {
            event,
            name,
            subcat,
            admin,
        } => {
            admin_login(portal, &admin, now)?;
            let ev = portal.catalog().resolve(&event)?;
            let removed = portal.store().remove_registration(&ev.name, &name, &subcat)?;
            if removed == 0 {
                println!("No matching registration found.");
            } else {
                println!("Removed {} registration(s)", removed);
            }
        }
    }
    Ok(())
}

fn messages(portal: &AppPortal, command: MessagesCommands, now: NaiveDateTime) -> Result<()> {
    match command {
        MessagesCommands::Send { from, event, text } => {
            let identity = portal.login_participant(&from, now)?;
            let ev = portal.catalog().resolve(&event)?;
            let outgoing = OutgoingMessage::participant_to_admins(identity.name(), &ev.name, &text);
            report_sent(portal.store().send_message(&outgoing, now)?);
        }
        MessagesCommands::Reply {
            to,
            event,
            text,
            admin,
        } => {
            let identity = admin_login(portal, &admin, now)?;
            let ev = portal.catalog().resolve(&event)?;
            let outgoing = OutgoingMessage::admin_reply(&to, identity.name(), &ev.name, &text);
            report_sent(portal.store().send_message(&outgoing, now)?);
        }
        MessagesCommands::Thread { event, name } => {
            let ev = portal.catalog().resolve(&event)?;
            print_messages(&portal.store().thread(&ev.name, &name)?);
        }
        MessagesCommands::Inbox { name } => {
            print_messages(&portal.store().inbox(&name)?);
        }
        MessagesCommands::Feed {
            participant,
            event,
            admin,
        } => {
            admin_login(portal, &admin, now)?;
            let filter = FeedFilter { participant, event };
            print_messages(&portal.store().message_feed(&filter)?);
        }
    }
    Ok(())
}

fn report_sent(sent: Option<Message>) {
    match sent {
        Some(m) => println!("Sent to {} at {}", m.to, m.timestamp.format("%H:%M")),
        None => println!("Empty message not sent."),
    }
}

fn print_messages(msgs: &[Message]) {
    if msgs.is_empty() {
        println!("No messages.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["When", "Event", "From", "To", "Text"]);
    for m in msgs {
        table.add_row(row![
            m.timestamp.format("%d %b %H:%M"),
            m.event,
            m.from,
            m.to,
            m.text
        ]);
    }
    table.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_categories_and_participant_search() {
        let cli = Cli::try_parse_from(["cynosure", "events", "categories"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Events {
                events_command: EventsCommands::Categories
            }
        ));

        let cli = Cli::try_parse_from(["cynosure", "roster", "search", "asha"]).unwrap();
        match cli.command {
            Commands::Roster {
                roster_command: RosterCommands::Search { fragment },
            } => assert_eq!(fragment, "asha"),
            _ => panic!("expected roster search"),
        }
    }

    #[test]
    fn test_admin_flags_do_not_clash_with_participant_name() {
        let cli = Cli::try_parse_from([
            "cynosure", "roster", "add", "Quiz", "--name", "Ravi", "--admin", "Ms. Rao",
            "--password", "letmein",
        ])
        .unwrap();
        match cli.command {
            Commands::Roster {
                roster_command: RosterCommands::Add { name, admin, .. },
            } => {
                assert_eq!(name, "Ravi");
                assert_eq!(admin.admin_name, "Ms. Rao");
            }
            _ => panic!("expected roster add"),
        }
    }
}

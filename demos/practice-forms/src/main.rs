//! Practice forms
//!
//! Drives the practice forms from the command line: field values come from
//! flags, are typed into the form one field at a time and the form is then
//! submitted.
//!
//! ## Usage
//!
//! ```bash
//! practice-forms basic --username ab
//! practice-forms advanced --email Sincere@april.biz
//! practice-forms dynamic --phone 555-0100 --phone 555-0101 --remove-phone 0 --devtools
//! practice-forms array --entry first --entry second --remove 0
//! practice-forms --online dynamic --email jane@example.com
//! ```

mod directory;
mod forms;

use clap::{Args, Parser, Subcommand};
use formwork::forms::{FormValue, SetValueOptions, SubmitOutcome};
use forms::PracticeForm;
use serde_json::json;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "practice-forms")]
#[command(about = "Fill in and submit the practice forms", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbosity: u8,

	/// Check email availability against the real placeholder API
	#[arg(long, global = true)]
	online: bool,

	/// Print the session snapshot after submitting
	#[arg(long, global = true)]
	devtools: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Username, email and channel
	Basic(BasicArgs),
	/// Adds social handles and two phone numbers
	Advanced(AdvancedArgs),
	/// Adds age, date of birth and dynamic phone number and item lists
	Dynamic(DynamicArgs),
	/// Unvalidated fields with a `testF` field array
	Array(ArrayArgs),
}

#[derive(Args)]
struct BasicArgs {
	#[arg(long, default_value = "jane")]
	username: String,

	#[arg(long, default_value = "jane@example.com")]
	email: String,

	#[arg(long, default_value = "rustaceans")]
	channel: String,
}

#[derive(Args)]
struct AdvancedArgs {
	#[command(flatten)]
	basic: BasicArgs,

	#[arg(long, default_value = "@jane")]
	twitter: String,

	#[arg(long, default_value = "jane.fb")]
	facebook: String,

	#[arg(long, default_value = "555-0100")]
	primary_phone: String,

	#[arg(long, default_value = "5550101")]
	secondary_phone: String,
}

#[derive(Args)]
struct DynamicArgs {
	#[command(flatten)]
	advanced: AdvancedArgs,

	#[arg(long, default_value = "30")]
	age: String,

	/// Date of birth as YYYY-MM-DD
	#[arg(long, default_value = "1994-02-11")]
	dob: String,

	/// Add an entry to the phone number list (repeatable)
	#[arg(long = "phone", value_name = "NUMBER")]
	phones: Vec<String>,

	/// Add an entry to the item list (repeatable)
	#[arg(long = "item", value_name = "NUMBER")]
	items: Vec<String>,

	/// Remove a phone number entry by index before submitting
	#[arg(long, value_name = "INDEX")]
	remove_phone: Option<usize>,

	/// Overwrite the username and the item list like the "Set value" button
	#[arg(long)]
	set_values: bool,

	/// Validate username and email before submitting
	#[arg(long)]
	trigger: bool,
}

#[derive(Args)]
struct ArrayArgs {
	#[arg(long, default_value = "")]
	username: String,

	/// Add a `testF` entry (repeatable)
	#[arg(long = "entry", value_name = "TEST")]
	entries: Vec<String>,

	/// Remove a `testF` entry by index (repeatable, applied in order)
	#[arg(long, value_name = "INDEX")]
	remove: Vec<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbosity);

	let result = match cli.command {
		Commands::Basic(args) => run_basic(args, cli.devtools).await,
		Commands::Advanced(args) => run_advanced(args, cli.online, cli.devtools).await,
		Commands::Dynamic(args) => run_dynamic(args, cli.online, cli.devtools).await,
		Commands::Array(args) => run_array(args, cli.devtools).await,
	};

	match result {
		Ok(SubmitOutcome::Valid) => {}
		Ok(SubmitOutcome::Invalid) => process::exit(2),
		Err(e) => {
			eprintln!("Error: {:#}", e);
			process::exit(1);
		}
	}
}

fn init_tracing(verbosity: u8) {
	let default = match verbosity {
		0 => "info",
		1 => "info,formwork_forms=debug,formwork_validators=debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(filter)
		.init();
}

async fn fill_basic(form: &PracticeForm, args: &BasicArgs) -> anyhow::Result<()> {
	form.fill("username", &args.username).await?;
	form.fill("email", &args.email).await?;
	form.fill("channel", &args.channel).await?;
	Ok(())
}

async fn fill_advanced(form: &PracticeForm, args: &AdvancedArgs) -> anyhow::Result<()> {
	fill_basic(form, &args.basic).await?;
	// Ignored by the dynamic form, where twitter is disabled.
	form.fill("social.twitter", &args.twitter).await?;
	form.fill("social.facebook", &args.facebook).await?;
	form.fill("phoneNumbers.0", &args.primary_phone).await?;
	form.fill("phoneNumbers.1", &args.secondary_phone).await?;
	Ok(())
}

async fn run_basic(args: BasicArgs, devtools: bool) -> anyhow::Result<SubmitOutcome> {
	let form = forms::basic_form()?;
	fill_basic(&form, &args).await?;
	submit(&form, devtools).await
}

async fn run_advanced(args: AdvancedArgs, online: bool, devtools: bool) -> anyhow::Result<SubmitOutcome> {
	let form = forms::advanced_form(directory::email_lookup(online))?;
	fill_advanced(&form, &args).await?;
	submit(&form, devtools).await
}

async fn run_dynamic(args: DynamicArgs, online: bool, devtools: bool) -> anyhow::Result<SubmitOutcome> {
	let today = chrono::Local::now().date_naive();
	let form = forms::dynamic_form(directory::email_lookup(online), today)?;

	let _username_log = form.session.watch_path("username", |value| {
		tracing::debug!(username = ?value.map(FormValue::to_json), "username changed");
	})?;

	fill_advanced(&form, &args.advanced).await?;
	form.fill("age", &args.age).await?;
	form.fill("dob", &args.dob).await?;
	for phone in &args.phones {
		form.add_entry("phNumbers", "number", phone).await?;
	}
	for item in &args.items {
		form.add_entry("items", "number", item).await?;
	}
	if let Some(index) = args.remove_phone {
		form.array("phNumbers")?.remove(index)?;
	}

	if args.set_values {
		form.session
			.set_value("username", "John Doe", SetValueOptions::all())
			.await?;
		form.session
			.set_value(
				"items",
				json!([{"number": "123"}, {"number": "456"}]),
				SetValueOptions::default(),
			)
			.await?;
		let values = form.session.get_values(&["items", "username"]);
		tracing::info!(?values, "values after set_value");
	}

	if args.trigger {
		let valid = form.session.trigger_many(&["username", "email"]).await?;
		tracing::info!(valid, "triggered username and email");
	}

	submit(&form, devtools).await
}

async fn run_array(args: ArrayArgs, devtools: bool) -> anyhow::Result<SubmitOutcome> {
	let form = forms::array_form()?;
	form.fill("username", &args.username).await?;
	for entry in &args.entries {
		form.add_entry("testF", "test", entry).await?;
	}
	let array = form.array("testF")?;
	for index in &args.remove {
		array.remove(*index)?;
	}
	tracing::info!(dirty = form.session.status().is_dirty, entries = array.len(), "testF ready");
	submit(&form, devtools).await
}

async fn submit(form: &PracticeForm, devtools: bool) -> anyhow::Result<SubmitOutcome> {
	let status = form.session.status();
	if !status.can_submit() {
		tracing::info!(
			dirty = status.is_dirty,
			valid = status.is_valid,
			"submit button would be disabled"
		);
	}

	let outcome = form
		.session
		.handle_submit(
			|values| tracing::info!(values = %values.to_json(), "form submitted"),
			|errors| {
				for (field, error) in errors {
					tracing::warn!(%field, kind = %error.kind, message = %error.message, "invalid field");
				}
			},
		)
		.await?;

	let status = form.session.status();
	println!(
		"{:?} (submitted {} time(s), successful: {})",
		outcome, status.submit_count, status.is_submit_successful
	);
	for (field, error) in form.session.errors() {
		println!("  {}: {}", field, error.message);
	}
	if devtools {
		println!("{}", form.session.snapshot().to_json_pretty()?);
	}
	Ok(outcome)
}

//! Interactive console: each input line is one interaction and is answered
//! with a full re-render of the page.

use chrono::NaiveDate;
use log::debug;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use crate::app::{Action, App};
use crate::models::{ActivityCategory, FarmId, VarietyId};
use crate::render::Notice;
use crate::repository::activities::ActivityForm;
use crate::repository::farms::FarmForm;
use crate::repository::harvests::HarvestForm;
use crate::repository::soil::SoilTestForm;
use crate::secrets::{take_double_quoted, take_single_quoted};
use crate::session::SessionStore;

pub const HELP: &str = "\
Commands
  login <email> <password>
  logout
  refresh
  add-farmer email=<email> password=<password> name=\"<full name>\"
  add-farm name=\"<farm name>\" location=\"<location>\"
  add-harvest farm=<id> date=YYYY-MM-DD weight=<kg> variety=<id> harvester=\"<name>\"
  add-soil-test farm=<id> date=YYYY-MM-DD ph=<pH> n=<ppm> p=<ppm> k=<ppm> om=<%> notes=\"<text>\"
  add-activity farm=<id> date=YYYY-MM-DD category=<category> type=<type> description=\"<text>\"
  soil-tests            show/hide soil tests
  gap-report [year]     show the GAP activity report
  hide-report
  help
  quit";

#[derive(Debug)]
pub enum Command {
    Act(Action),
    Help,
    Quit,
}

/// Splits a line into words; `"..."` and `'...'` may appear anywhere in a
/// word (typically after `key=`).
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut rest = line;

    while let Some(ch) = rest.chars().next() {
        rest = &rest[ch.len_utf8()..];
        match ch {
            '"' => {
                let (value, after) = take_double_quoted(rest)?;
                current.push_str(&value);
                rest = after;
                in_word = true;
            }
            '\'' => {
                let (value, after) = take_single_quoted(rest)?;
                current.push_str(&value);
                rest = after;
                in_word = true;
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

struct Fields {
    command: &'static str,
    values: BTreeMap<String, String>,
}

impl Fields {
    fn parse(command: &'static str, words: &[String], allowed: &[&str]) -> Result<Self, String> {
        let mut values = BTreeMap::new();
        for w in words {
            let (k, v) = w
                .split_once('=')
                .ok_or_else(|| format!("{}: expected key=value, got {:?}", command, w))?;
            if !allowed.contains(&k) {
                return Err(format!("{}: unknown field {:?} (allowed: {})", command, k, allowed.join(", ")));
            }
            values.insert(k.to_string(), v.to_string());
        }
        Ok(Fields { command, values })
    }

    fn text(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// `None` when absent or blank; an error when present but malformed.
    fn parsed<T>(&self, key: &str, what: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, String> {
        match self.values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => parse(v)
                .map(Some)
                .ok_or_else(|| format!("{}: {} must be {}, got {:?}", self.command, key, what, v)),
        }
    }

    fn farm(&self) -> Result<Option<FarmId>, String> {
        self.parsed("farm", "a farm id", |v| v.parse().ok().map(FarmId))
    }

    fn date(&self) -> Result<Option<NaiveDate>, String> {
        self.parsed("date", "a date (YYYY-MM-DD)", |v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
    }

    fn number(&self, key: &str) -> Result<Option<f64>, String> {
        self.parsed(key, "a number", |v| v.parse::<f64>().ok())
    }
}

pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let words = tokenize(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match head.as_str() {
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "refresh" => Command::Act(Action::Refresh),
        "logout" => Command::Act(Action::Logout),
        "login" => match args {
            [email, password] => Command::Act(Action::Login {
                email: email.clone(),
                password: SecretString::from(password.clone()),
            }),
            _ => return Err("usage: login <email> <password>".to_string()),
        },
        "add-farmer" => {
            let f = Fields::parse("add-farmer", args, &["email", "password", "name"])?;
            Command::Act(Action::CreateFarmer {
                email: f.text("email"),
                password: SecretString::from(f.text("password")),
                full_name: f.text("name"),
            })
        }
        "add-farm" => {
            let f = Fields::parse("add-farm", args, &["name", "location"])?;
            Command::Act(Action::AddFarm(FarmForm {
                farm_name: f.text("name"),
                location: f.text("location"),
            }))
        }
        "add-harvest" => {
            let f = Fields::parse("add-harvest", args, &["farm", "date", "weight", "variety", "harvester"])?;
            Command::Act(Action::AddHarvest(HarvestForm {
                farm_id: f.farm()?,
                harvest_date: f.date()?,
                cherry_weight_kg: f.number("weight")?,
                variety_id: f.parsed("variety", "a variety id", |v| v.parse().ok().map(VarietyId))?,
                harvester_name: f.text("harvester"),
            }))
        }
        "add-soil-test" => {
            let f = Fields::parse("add-soil-test", args, &["farm", "date", "ph", "n", "p", "k", "om", "notes"])?;
            Command::Act(Action::AddSoilTest(SoilTestForm {
                farm_id: f.farm()?,
                test_date: f.date()?,
                ph_level: f.number("ph")?,
                nitrogen_ppm: f.number("n")?,
                phosphorus_ppm: f.number("p")?,
                potassium_ppm: f.number("k")?,
                organic_matter_percent: f.number("om")?,
                recommendations: f.text("notes"),
            }))
        }
        "add-activity" => {
            let f = Fields::parse("add-activity", args, &["farm", "date", "category", "type", "description"])?;
            let categories = ActivityCategory::ALL.map(ActivityCategory::as_str).join(", ");
            Command::Act(Action::AddActivity(ActivityForm {
                farm_id: f.farm()?,
                activity_date: f.date()?,
                activity_category: f.parsed("category", &format!("one of {}", categories), ActivityCategory::parse)?,
                activity_type: f.text("type"),
                description: f.text("description"),
            }))
        }
        "soil-tests" => Command::Act(Action::ToggleSoilTests),
        "gap-report" => match args {
            [] => Command::Act(Action::ShowGapReport { year: None }),
            [year] => Command::Act(Action::ShowGapReport {
                year: Some(year.parse().map_err(|_| format!("gap-report: not a year: {:?}", year))?),
            }),
            _ => return Err("usage: gap-report [year]".to_string()),
        },
        "hide-report" => Command::Act(Action::HideGapReport),
        other => return Err(format!("unknown command {:?}; type `help`", other)),
    };
    Ok(Some(command))
}

/// Runs until `quit` or end of input.
pub fn run<S: SessionStore>(app: &mut App<'_, S>, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    writeln!(output, "{}", app.handle(Action::Refresh).to_text())?;
    for line in input.lines() {
        let line = line?;
        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Help)) => writeln!(output, "{}", HELP)?,
            Ok(Some(Command::Act(action))) => {
                debug!("Handling {}", action.name());
                writeln!(output, "\n{}", app.handle(action).to_text())?;
            }
            Err(message) => {
                writeln!(output, "\n{}", app.render(vec![Notice::error(message)]).to_text())?;
            }
        }
        output.flush()?;
    }
    Ok(())
}

//! Line-oriented command interpreter.
//!
//! Each input line is parsed into a [`Command`] and run against the storage engine.
//! User mistakes and backend failures are reported as a single diagnostic line on the
//! output and never end the session; only a failure to write the output does.

pub mod parser;

pub use parser::{Command, parse_line};

use crate::{
    errors::{Error, Result},
    models::{Entity, EntityKind},
    storage::Storage,
};
use serde_json::{Map, Value};
use std::{io::Write, path::PathBuf};
use tracing::{debug, warn};

/// Prompt shown before each line on an interactive terminal.
pub const PROMPT: &str = "(hbnb) ";

const CLASS_MISSING: &str = "** class name missing **";
const CLASS_UNKNOWN: &str = "** class doesn't exist **";
const ID_MISSING: &str = "** instance id missing **";
const NO_INSTANCE: &str = "** no instance found **";
const ATTRIBUTE_MISSING: &str = "** attribute name missing **";
const VALUE_MISSING: &str = "** value missing **";

const HELP_TOPICS: [(&str, &str); 8] = [
    ("EOF", "Exit the interpreter at end of input"),
    ("all", "Print every instance, or every instance of a class: all [Type]"),
    ("count", "Print the number of instances of a class: count Type"),
    ("create", "Create and save an instance, print its id: create Type [key=value ...]"),
    ("destroy", "Delete an instance: destroy Type id"),
    ("quit", "Exit the interpreter"),
    ("show", "Print an instance: show Type id"),
    ("update", "Set one attribute of an instance: update Type id attr value"),
];

const OUTPUT: &str = "<output>";

fn output_error(source: std::io::Error) -> Error {
    Error::Io {
        path: PathBuf::from(OUTPUT),
        source,
    }
}

fn is_output_error(error: &Error) -> bool {
    matches!(error, Error::Io { path, .. } if path.as_os_str() == OUTPUT)
}

/// Whether the read loop should keep going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,
    /// End the session
    Stop,
}

/// The interpreter, writing its responses to `out`.
#[derive(Debug)]
pub struct Console<S, W> {
    storage: S,
    out: W,
}

impl<S: Storage, W: Write> Console<S, W> {
    /// Creates an interpreter over an engine that has already been reloaded.
    pub const fn new(storage: S, out: W) -> Self {
        Self { storage, out }
    }

    /// The engine the interpreter runs against.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Output sink.
    pub const fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Releases the engine and the output sink.
    pub fn into_parts(self) -> (S, W) {
        (self.storage, self.out)
    }

    fn emit(&mut self, line: impl std::fmt::Display) -> Result<()> {
        writeln!(self.out, "{line}").map_err(output_error)
    }

    /// Writes the prompt without a newline.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the output cannot be written.
    pub fn prompt(&mut self) -> Result<()> {
        write!(self.out, "{PROMPT}")
            .and_then(|()| self.out.flush())
            .map_err(output_error)
    }

    /// Runs one input line.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the output cannot be written. Every other failure is
    /// reported on the output.
    pub async fn onecmd(&mut self, line: &str) -> Result<Flow> {
        debug!(line, "Running command");
        let command = match parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                self.report(&e)?;
                return Ok(Flow::Continue);
            }
        };

        let outcome = match command {
            Command::Empty => Ok(()),
            Command::Quit | Command::Eof => return Ok(Flow::Stop),
            Command::Help(topic) => self.help(topic.as_deref()),
            Command::Create { class, params } => self.create(class.as_deref(), params).await,
            Command::Show { class, id } => self.show(class.as_deref(), id.as_deref()).await,
            Command::Destroy { class, id } => self.destroy(class.as_deref(), id.as_deref()).await,
            Command::All { class } => self.all(class.as_deref()).await,
            Command::Count { class } => self.count(class.as_deref()).await,
            Command::Update {
                class,
                id,
                attribute,
                value,
            } => {
                self.update(class.as_deref(), id.as_deref(), attribute.as_deref(), value)
                    .await
            }
            Command::UpdateMany {
                class,
                id,
                attributes,
            } => self.update_many(&class, &id, attributes).await,
            Command::Unknown(line) => self.emit(format!("*** Unknown syntax: {line}")),
        };

        if let Err(e) = outcome {
            if is_output_error(&e) {
                return Err(e);
            }
            self.report(&e)?;
        }
        Ok(Flow::Continue)
    }

    fn report(&mut self, error: &Error) -> Result<()> {
        match error {
            Error::UnknownType { .. } => self.emit(CLASS_UNKNOWN),
            Error::NotFound { .. } => self.emit(NO_INSTANCE),
            other => {
                warn!("Command failed: {other}");
                self.emit(format!("** {other} **"))
            }
        }
    }

    /// Resolves the class argument, writing the matching diagnostic when it is missing
    /// or unknown.
    fn class(&mut self, class: Option<&str>) -> Result<Option<EntityKind>> {
        match class {
            None => {
                self.emit(CLASS_MISSING)?;
                Ok(None)
            }
            Some(name) => match name.parse::<EntityKind>() {
                Ok(kind) => Ok(Some(kind)),
                Err(_) => {
                    self.emit(CLASS_UNKNOWN)?;
                    Ok(None)
                }
            },
        }
    }

    /// Resolves class and id to a stored entity, writing the matching diagnostic on the
    /// first check that fails.
    async fn instance(&mut self, class: Option<&str>, id: Option<&str>) -> Result<Option<Entity>> {
        let Some(kind) = self.class(class)? else {
            return Ok(None);
        };
        let Some(id) = id else {
            self.emit(ID_MISSING)?;
            return Ok(None);
        };
        let key = kind.key(id);
        match self.storage.get(kind, id).await? {
            Some(entity) => Ok(Some(entity)),
            None => Err(Error::NotFound { key }),
        }
    }

    fn help(&mut self, topic: Option<&str>) -> Result<()> {
        match topic {
            None => {
                self.emit("Documented commands (type help <topic>):")?;
                self.emit("========================================")?;
                let names: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
                self.emit(names.join("  "))
            }
            Some(topic) => match HELP_TOPICS.iter().find(|(name, _)| *name == topic) {
                Some((_, text)) => self.emit(text),
                None => self.emit(format!("*** No help on {topic}")),
            },
        }
    }

    async fn create(&mut self, class: Option<&str>, params: Vec<(String, Value)>) -> Result<()> {
        let Some(kind) = self.class(class)? else {
            return Ok(());
        };
        let mut entity = Entity::fresh(kind);
        for (name, value) in params {
            if let Err(e) = entity.set_attr(&name, value) {
                debug!("Skipping parameter {name}: {e}");
            }
        }
        entity.save(&mut self.storage).await?;
        self.emit(entity.id())
    }

    async fn show(&mut self, class: Option<&str>, id: Option<&str>) -> Result<()> {
        if let Some(entity) = self.instance(class, id).await? {
            self.emit(entity)?;
        }
        Ok(())
    }

    async fn destroy(&mut self, class: Option<&str>, id: Option<&str>) -> Result<()> {
        if let Some(entity) = self.instance(class, id).await? {
            entity.delete(&mut self.storage).await?;
            self.storage.save().await?;
        }
        Ok(())
    }

    async fn all(&mut self, class: Option<&str>) -> Result<()> {
        let kind = match class {
            None => None,
            Some(name) => match name.parse::<EntityKind>() {
                Ok(kind) => Some(kind),
                Err(_) => return self.emit(CLASS_UNKNOWN),
            },
        };
        let listing: Vec<String> = self
            .storage
            .all(kind)
            .await?
            .values()
            .map(ToString::to_string)
            .collect();
        self.emit(serde_json::to_string(&listing)?)
    }

    async fn count(&mut self, class: Option<&str>) -> Result<()> {
        let Some(kind) = self.class(class)? else {
            return Ok(());
        };
        let count = self.storage.count(Some(kind)).await?;
        self.emit(count)
    }

    async fn update(
        &mut self,
        class: Option<&str>,
        id: Option<&str>,
        attribute: Option<&str>,
        value: Option<Value>,
    ) -> Result<()> {
        let Some(mut entity) = self.instance(class, id).await? else {
            return Ok(());
        };
        let Some(attribute) = attribute else {
            return self.emit(ATTRIBUTE_MISSING);
        };
        let Some(value) = value else {
            return self.emit(VALUE_MISSING);
        };
        entity.set_attr(attribute, value)?;
        entity.save(&mut self.storage).await
    }

    async fn update_many(
        &mut self,
        class: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> Result<()> {
        let Some(mut entity) = self.instance(Some(class), Some(id)).await? else {
            return Ok(());
        };
        for (name, value) in attributes {
            entity.set_attr(&name, value)?;
        }
        entity.save(&mut self.storage).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::storage::{Engine, FileStorage};
    use crate::test_utils::{file_engine, init_test_tracing, memory_db_engine};
    use serde_json::json;

    type TestConsole = Console<Engine, Vec<u8>>;

    async fn file_console() -> Result<(tempfile::TempDir, TestConsole)> {
        init_test_tracing();
        let (dir, engine) = file_engine().await?;
        Ok((dir, Console::new(engine, Vec::new())))
    }

    /// Runs `line` and returns what it printed.
    async fn run(console: &mut TestConsole, line: &str) -> Result<String> {
        console.onecmd(line).await?;
        let out = std::mem::take(console.writer_mut());
        Ok(String::from_utf8(out).unwrap())
    }

    async fn create(console: &mut TestConsole, line: &str) -> Result<String> {
        Ok(run(console, line).await?.trim_end().to_string())
    }

    /// One console per backend, each over fresh storage. The directory holds the file
    /// backend's document.
    async fn consoles() -> Result<(tempfile::TempDir, Vec<TestConsole>)> {
        let (dir, file) = file_engine().await?;
        let db = memory_db_engine().await?;
        Ok((
            dir,
            vec![Console::new(file, Vec::new()), Console::new(db, Vec::new())],
        ))
    }

    /// Creates a state, a city in it and a user. Returns the city and user ids.
    async fn create_owners(console: &mut TestConsole) -> Result<(String, String)> {
        let state = create(console, r#"create State name="Nevada""#).await?;
        let city = create(
            console,
            &format!(r#"create City state_id="{state}" name="Reno""#),
        )
        .await?;
        let user = create(console, r#"create User email="host@hbnb.io" password="pwd""#).await?;
        Ok((city, user))
    }

    #[tokio::test]
    async fn test_empty_line_and_quit_print_nothing() -> Result<()> {
        let (_dir, mut console) = file_console().await?;
        assert_eq!(run(&mut console, "").await?, "");
        assert_eq!(console.onecmd("quit").await?, Flow::Stop);
        assert_eq!(console.onecmd("EOF").await?, Flow::Stop);
        assert!(console.writer_mut().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_diagnostics() -> Result<()> {
        let (_dir, mut console) = file_console().await?;
        let id = create(&mut console, "create BaseModel").await?;

        let cases = [
            ("show", CLASS_MISSING),
            ("show BModel", CLASS_UNKNOWN),
            ("show BaseModel", ID_MISSING),
            ("show BaseModel nope", NO_INSTANCE),
            ("destroy", CLASS_MISSING),
            ("destroy BaseModel nope", NO_INSTANCE),
            ("create", CLASS_MISSING),
            ("create BModel", CLASS_UNKNOWN),
            ("update", CLASS_MISSING),
            ("update BaseModel", ID_MISSING),
            ("update BaseModel nope", NO_INSTANCE),
            ("all BModel", CLASS_UNKNOWN),
            ("BModel.all()", CLASS_UNKNOWN),
            ("BModel.count()", CLASS_UNKNOWN),
            ("BModel.show()", CLASS_UNKNOWN),
            ("BaseModel.update(\"123\")", NO_INSTANCE),
            ("BaseModel.update()", ID_MISSING),
        ];
        for (line, expected) in cases {
            assert_eq!(run(&mut console, line).await?, format!("{expected}\n"), "{line}");
        }

        let line = format!("update BaseModel {id}");
        assert_eq!(run(&mut console, &line).await?, format!("{ATTRIBUTE_MISSING}\n"));
        let line = format!("update BaseModel {id} fname");
        assert_eq!(run(&mut console, &line).await?, format!("{VALUE_MISSING}\n"));
        let line = format!("BaseModel.update(\"{id}\", \"fname\")");
        assert_eq!(run(&mut console, &line).await?, format!("{VALUE_MISSING}\n"));

        assert_eq!(
            run(&mut console, "launch rockets").await?,
            "*** Unknown syntax: launch rockets\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_state_then_list() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let id = create(&mut console, r#"create State name="California""#).await?;

            let states = console.storage().all(Some(EntityKind::State)).await?;
            assert_eq!(states.len(), 1);
            let state = &states[&EntityKind::State.key(&id)];
            assert_eq!(state.to_representation()["name"], json!("California"));

            let listing = run(&mut console, "all State").await?;
            let parsed: Vec<String> = serde_json::from_str(&listing)?;
            assert_eq!(parsed, vec![state.to_string()]);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reads_numbers() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let (city, user) = create_owners(&mut console).await?;
            let line = format!(
                r#"create Place city_id="{city}" user_id="{user}" name="Loft" number_rooms=1234 latitude=37.773972 longitude=-122.431297"#
            );
            let id = create(&mut console, &line).await?;
            let shown = run(&mut console, &format!("show Place {id}")).await?;
            assert!(shown.starts_with(&format!("[Place] ({id}) ")), "{shown}");
            assert!(shown.contains("\"number_rooms\":1234"));
            assert!(shown.contains("37.773972"));
            assert!(shown.contains("-122.431297"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_replaces_underscores_and_skips_invalid() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let (city, user) = create_owners(&mut console).await?;
            let place = create(
                &mut console,
                &format!(r#"create Place city_id="{city}" user_id="{user}" name="Loft""#),
            )
            .await?;
            let owners = format!(r#"place_id="{place}" user_id="{user}""#);

            let id = create(
                &mut console,
                &format!(r#"create Review {owners} text="My_little_house""#),
            )
            .await?;
            let shown = run(&mut console, &format!("show Review {id}")).await?;
            assert!(shown.contains("\"text\":\"My little house\""), "{shown}");

            let line = format!(r#"create Review {owners} text="ok" rating=Good val val_2="#);
            let id = create(&mut console, &line).await?;
            let shown = run(&mut console, &format!("show Review {id}")).await?;
            assert!(shown.starts_with("[Review]"), "{shown}");
            assert!(!shown.contains("rating"));
            assert!(!shown.contains("val_2"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_destroy_then_show_reports_not_found() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let id = create(&mut console, r#"create State name="Utah""#).await?;
            assert_eq!(run(&mut console, &format!("State.destroy(\"{id}\")")).await?, "");
            assert_eq!(
                run(&mut console, &format!("show State {id}")).await?,
                format!("{NO_INSTANCE}\n")
            );
            assert_eq!(
                run(&mut console, &format!("destroy State {id}")).await?,
                format!("{NO_INSTANCE}\n")
            );
            assert!(console.storage().get(EntityKind::State, &id).await?.is_none());

            // the deletion reached the document, not just the working set
            if let Engine::File(storage) = console.storage() {
                let mut fresh = FileStorage::new(storage.path());
                fresh.reload().await?;
                assert!(fresh.get(EntityKind::State, &id).await?.is_none());
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_update_forms() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let id = create(&mut console, r#"create State name="Draft""#).await?;
            run(&mut console, &format!("update State {id} name example_state")).await?;
            run(&mut console, &format!("update State {id} id hijacked")).await?;
            let shown = run(&mut console, &format!("show State {id}")).await?;
            assert!(shown.contains("\"name\":\"example_state\""), "{shown}");
            assert!(!shown.contains("hijacked"));

            let id = create(&mut console, r#"create Amenity name="Sauna""#).await?;
            run(&mut console, &format!(r#"Amenity.update("{id}", "rev_k", "rev_v")"#)).await?;
            let shown = run(&mut console, &format!("show Amenity {id}")).await?;
            assert!(shown.contains("\"rev_k\":\"rev_v\""), "{shown}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_update_with_dict() -> Result<()> {
        let (_dir, consoles) = consoles().await?;
        for mut console in consoles {
            let id = create(&mut console, r#"create Amenity name="Wifi""#).await?;
            let line =
                format!("Amenity.update(\"{id}\", {{ 'name' : 'amne', 'rev_k' : 'rev_v' }})");
            assert_eq!(run(&mut console, &line).await?, "");

            let shown = run(&mut console, &format!("Amenity.show(\"{id}\")")).await?;
            assert!(shown.contains("\"name\":\"amne\""), "{shown}");
            assert!(shown.contains("\"rev_k\":\"rev_v\""), "{shown}");

            let amenity = console
                .storage()
                .get(EntityKind::Amenity, &id)
                .await?
                .unwrap();
            let repr = amenity.to_representation();
            assert_eq!(repr["name"], json!("amne"));
            assert_eq!(repr["rev_k"], json!("rev_v"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_dict_reports_and_continues() -> Result<()> {
        let (_dir, mut console) = file_console().await?;
        let out = run(&mut console, r#"Place.update("p", {'a': oops})"#).await?;
        assert!(out.starts_with("** Parse error:"));
        assert_eq!(console.onecmd("count Place").await?, Flow::Continue);
        Ok(())
    }

    #[tokio::test]
    async fn test_count_and_all() -> Result<()> {
        let (_dir, mut console) = file_console().await?;
        for _ in 0..5 {
            create(&mut console, "create Place").await?;
        }
        create(&mut console, "create User").await?;
        assert_eq!(run(&mut console, "Place.count()").await?, "5\n");
        assert_eq!(run(&mut console, "count User").await?, "1\n");

        let users = run(&mut console, "User.all()").await?;
        assert!(users.contains("[User]"));
        assert!(!users.contains("[Place]"));
        let everything: Vec<String> = serde_json::from_str(&run(&mut console, "all").await?)?;
        assert_eq!(everything.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_help() -> Result<()> {
        let (_dir, mut console) = file_console().await?;
        assert!(run(&mut console, "help").await?.contains("create"));
        assert_eq!(
            run(&mut console, "help nothing").await?,
            "*** No help on nothing\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_relational_console_reports_constraint_failures() -> Result<()> {
        init_test_tracing();
        let mut console = Console::new(memory_db_engine().await?, Vec::new());

        let state = create(&mut console, r#"create State name="California""#).await?;
        let city = create(
            &mut console,
            &format!(r#"create City state_id="{state}" name="Fresno""#),
        )
        .await?;
        let shown = run(&mut console, &format!("City.show(\"{city}\")")).await?;
        assert!(shown.contains("Fresno"));

        let out = run(&mut console, "create City name=\"Nowhere\"").await?;
        assert!(out.contains("Transaction error"));

        run(&mut console, &format!("destroy State {state}")).await?;
        assert_eq!(run(&mut console, "count City").await?, "0\n");
        Ok(())
    }
}

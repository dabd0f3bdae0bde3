use clap::{Args, Parser, Subcommand};
use client::{AnimalFormView, AnimalListView, HerdView, HttpClient, LivestockFeature};
use uuid::Uuid;

/// Terminal client for the livestock tracker.
#[derive(Parser, Debug)]
#[command(name = "livestock")]
struct Cli {
    /// Server root URL
    #[arg(long, env = "LIVESTOCK_API_URL")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List animals, optionally narrowed to one type
    List {
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one animal
    Show { id: Uuid },
    /// Register a new animal
    Add(AnimalFields),
    /// Change selected fields of an animal
    Edit {
        id: Uuid,
        #[command(flatten)]
        fields: AnimalFields,
    },
    /// Remove an animal
    Remove { id: Uuid },
    /// Register a new herd
    HerdAdd {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        capacity: Option<i64>,
    },
    /// Show head count and weight of one herd
    HerdShow { id: Uuid },
    /// Move animals into a herd, all or none
    Move {
        herd_id: Uuid,
        #[arg(required = true)]
        animal_ids: Vec<Uuid>,
    },
}

#[derive(Args, Debug)]
struct AnimalFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    breed: Option<String>,
    #[arg(long)]
    birth_date: Option<String>,
    #[arg(long)]
    weight_kg: Option<String>,
    #[arg(long)]
    herd_id: Option<String>,
}

impl AnimalFields {
    fn fill(&self, form: &mut AnimalFormView) {
        let fields = [
            ("name", &self.name),
            ("type", &self.kind),
            ("tag", &self.tag),
            ("breed", &self.breed),
            ("birth_date", &self.birth_date),
            ("weight_kg", &self.weight_kg),
            ("herd_id", &self.herd_id),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                form.set_field(field, value);
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    utils::logging::init("warn");
    let cli = Cli::parse();

    let url = checked_api_url(&cli.api_url)?;
    let feature = LivestockFeature::over_http(HttpClient::new(&url));

    let failed = match cli.command {
        Command::List { kind, page } => {
            let view = AnimalListView::new(feature.facade());
            let filtered = kind.is_some();
            if filtered {
                view.filter(kind).await;
            }
            if !filtered || page != 1 {
                view.show_page(page).await;
            }
            print!("{}", view.render());
            view.has_error()
        }
        Command::Show { id } => {
            let view = AnimalListView::new(feature.facade());
            view.open(id).await;
            print!("{}", view.render());
            view.has_error()
        }
        Command::Add(fields) => {
            let mut form = AnimalFormView::new(feature.facade());
            fields.fill(&mut form);
            form.submit().await;
            print!("{}", form.render());
            form.has_error()
        }
        Command::Edit { id, fields } => {
            let mut form = AnimalFormView::new(feature.facade());
            form.edit(id);
            fields.fill(&mut form);
            form.submit().await;
            print!("{}", form.render());
            form.has_error()
        }
        Command::Remove { id } => {
            let view = AnimalListView::new(feature.facade());
            view.remove(id).await;
            print!("{}", view.render());
            view.has_error()
        }
        Command::HerdAdd { name, location, capacity } => {
            let view = HerdView::new(feature.facade());
            view.create(&name, location.as_deref(), capacity).await;
            print!("{}", view.render());
            view.has_error()
        }
        Command::HerdShow { id } => {
            let view = HerdView::new(feature.facade());
            view.show(id).await;
            print!("{}", view.render());
            view.has_error()
        }
        Command::Move { herd_id, animal_ids } => {
            let view = HerdView::new(feature.facade());
            view.move_animals(herd_id, animal_ids).await;
            print!("{}", view.render());
            view.has_error()
        }
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn checked_api_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        anyhow::bail!("LIVESTOCK_API_URL must start with http:// or https://, got {trimmed:?}");
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_url_scheme_is_checked() {
        assert!(checked_api_url("localhost:3000").is_err());
        assert_eq!(checked_api_url(" http://x:1 ").unwrap(), "http://x:1");
    }

    #[test]
    fn test_edit_parses_fields() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "livestock", "--api-url", "http://x", "edit", id.as_str(), "--weight-kg", "410",
        ])
        .unwrap();
        match cli.command {
            Command::Edit { fields, .. } => assert_eq!(fields.weight_kg.as_deref(), Some("410")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_move_takes_herd_then_animals() {
        let herd = Uuid::new_v4().to_string();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "livestock", "--api-url", "http://x", "move", herd.as_str(), &a.to_string(), &b.to_string(),
        ])
        .unwrap();
        match cli.command {
            Command::Move { animal_ids, .. } => assert_eq!(animal_ids, vec![a, b]),
            other => panic!("unexpected command {other:?}"),
        }

        let missing = Cli::try_parse_from(["livestock", "--api-url", "http://x", "move", herd.as_str()]);
        assert!(missing.is_err());
    }
}

use clap::Subcommand;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::CompanyService;
use crate::tenancy::{context::run_as, Actor};

#[derive(Subcommand)]
pub enum CompanyCommands {
    #[command(about = "Create a company")]
    Create {
        #[arg(help = "Company name")]
        name: String,
    },

    #[command(about = "List companies")]
    List,
}

pub async fn handle(cmd: CompanyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = CompanyService::new(open_store().await?);

    match cmd {
        CompanyCommands::Create { name } => {
            let company = run_as(Actor::system(), service.create(&name)).await?;
            output_success(
                &output_format,
                &format!("Created company '{}' (id {})", company.name, company.id.unwrap_or_default()),
                Some(serde_json::to_value(&company)?),
            )
        }
        CompanyCommands::List => {
            let companies = run_as(Actor::system(), service.list()).await?;
            let items = companies
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            output_collection(&output_format, "companies", items, &["ID", "NAME", "CREATED"], |c| {
                vec![cell(&c["id"]), cell(&c["name"]), cell(&c["created_at"])]
            })
        }
    }
}

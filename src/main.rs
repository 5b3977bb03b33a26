use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use storefront_client::api::StorefrontClient;
use storefront_client::config::ClientConfig;
use storefront_client::security::credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
use storefront_client::utils;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront API client")]
struct AppCli {
    /// Config file path
    #[arg(short, long, default_value = "storefront.json", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session credentials
    Login { email: String, password: String },
    /// Log out and clear the stored session
    Logout,
    /// Show the logged-in user's profile
    Profile,
    /// List product categories
    Categories,
    /// Search the catalog
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Show one product's details
    Product { id: String },
    /// Show the cart
    Cart,
    /// Add a product to the cart
    CartAdd { product_id: String },
    /// Remove a cart item
    CartRemove { item_id: String },
    /// List past orders
    Orders,
}

fn open_storage(config: &ClientConfig) -> Result<Arc<dyn CredentialStore>> {
    match &config.credentials_file {
        Some(path) => Ok(Arc::new(FileCredentialStore::open(path)?)),
        None => Ok(Arc::new(MemoryCredentialStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    let config = ClientConfig::load(&args.config)?;
    let storage = open_storage(&config)?;
    let client = StorefrontClient::new(&config, storage)?;

    match args.command {
        Commands::Login { email, password } => {
            client.login(&email, &password).await?;
            info!("logged in as {email}");
        }
        Commands::Logout => {
            let message = client.logout().await?;
            info!("{message}");
        }
        Commands::Profile => {
            let details = client.user_details().await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "id": details.id,
                "name": details.name,
                "email": details.email,
                "role": details.role,
            }))?);
        }
        Commands::Categories => {
            let categories = client.categories().await?;
            for category in categories {
                println!("{}  {}", category.id, category.name);
            }
        }
        Commands::Search { query, page, limit } => {
            let results = client.search_products(&query, page, limit).await?;
            info!(
                "page {page}/{} ({} products total)",
                results.total_pages, results.total_count
            );
            for product in results.items {
                println!("{}  {}  {:.2}", product.id, product.name, product.price);
            }
        }
        Commands::Product { id } => {
            let product = client.product_details(&id).await?;
            println!("{}", serde_json::to_string_pretty(&product)?);
        }
        Commands::Cart => {
            let items = client.cart_items().await?;
            for item in &items {
                let name = item
                    .product
                    .as_ref()
                    .map(|p| p.name.as_str())
                    .unwrap_or("<unknown>");
                println!("{}  x{}  {}", item.id, item.quantity, name);
            }
            if items.is_empty() {
                println!("cart is empty");
            }
        }
        Commands::CartAdd { product_id } => {
            client.add_to_cart(&product_id).await?;
            info!("added {product_id} to cart");
        }
        Commands::CartRemove { item_id } => {
            client.remove_cart_item(&item_id).await?;
            info!("removed cart item {item_id}");
        }
        Commands::Orders => {
            let orders = client.order_list().await?;
            for order in orders {
                println!(
                    "{}  {}  {:.2}  {}",
                    order.id,
                    order.order_id,
                    order.total_amount,
                    order.payment_status.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

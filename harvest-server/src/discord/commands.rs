//! Slash command handlers
//!
//! Business failures are answered with an ephemeral message; only transport
//! and signature problems become HTTP errors.

use shared::error::{AppError, ErrorCode};
use shared::models::{CHAT_UNIT_PRICE, DeliveryZone};
use shared::util::{format_date_millis, now_millis};
use sqlx::SqlitePool;

use super::interaction::{
    COLOR_INFO, COLOR_SUCCESS, CommandData, DiscordUser, Embed, Interaction, InteractionResponse,
};
use crate::auth::{generate_temp_password, hash_password};
use crate::db::repository::RepoError;
use crate::db::repository::chat::{self as chat_repo, NewChatAccount, NewChatOrder};
use crate::error::{ServiceError, ServiceResult};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, normalize_email, validate_email, validate_phone, validate_text_len,
};

const TEMP_PASSWORD_LEN: usize = 8;
const MAX_CHAT_LINE_QUANTITY: i64 = 999;
const MAX_FULL_NAME_LEN: usize = 100;

/// One entry of a typed product list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLine {
    pub quantity: i64,
    pub name: String,
}

/// Price breakdown of a chat order, in whole dollars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatQuote {
    pub unit_count: i64,
    pub products_total: i64,
    pub delivery_cost: i64,
    pub total: i64,
}

/// Parse `"2x Tomato, 1 x Apple, Mint"`; a missing prefix means one unit.
pub fn parse_product_list(raw: &str) -> Result<Vec<ProductLine>, AppError> {
    let mut lines = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        lines.push(parse_entry(entry)?);
    }
    if lines.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::OrderEmpty,
            "The product list is empty",
        ));
    }
    Ok(lines)
}

fn parse_entry(entry: &str) -> Result<ProductLine, AppError> {
    let digits_end = entry
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(entry.len());

    if digits_end > 0 {
        let rest = entry[digits_end..].trim_start();
        if let Some(name) = rest.strip_prefix(['x', 'X']).map(str::trim)
            && !name.is_empty()
        {
            let quantity = entry[..digits_end].parse::<i64>().unwrap_or(i64::MAX);
            if !(1..=MAX_CHAT_LINE_QUANTITY).contains(&quantity) {
                return Err(AppError::with_message(
                    ErrorCode::InvalidQuantity,
                    format!("Quantity for {name} must be between 1 and {MAX_CHAT_LINE_QUANTITY}"),
                ));
            }
            return Ok(ProductLine {
                quantity,
                name: name.to_owned(),
            });
        }
    }

    Ok(ProductLine {
        quantity: 1,
        name: entry.to_owned(),
    })
}

pub fn quote(lines: &[ProductLine], zone: DeliveryZone) -> ChatQuote {
    let unit_count: i64 = lines.iter().map(|l| l.quantity).sum();
    let products_total = unit_count * CHAT_UNIT_PRICE;
    let delivery_cost = zone.delivery_cost();
    ChatQuote {
        unit_count,
        products_total,
        delivery_cost,
        total: products_total + delivery_cost,
    }
}

/// Run an application command and build the reply
pub async fn dispatch(pool: &SqlitePool, interaction: &Interaction) -> InteractionResponse {
    let Some(data) = interaction.data.as_ref() else {
        return InteractionResponse::message("❌ Missing command data.");
    };
    let Some(invoker) = interaction.invoker() else {
        return InteractionResponse::message("❌ Could not identify the invoking user.");
    };

    let result = match data.name.as_str() {
        "create-account" => create_account(pool, invoker, data).await,
        "my-account" => my_account(pool, invoker).await,
        "order" => order(pool, invoker, data).await,
        "products" => Ok(products()),
        "deliveries" => Ok(deliveries()),
        other => {
            tracing::warn!(command = other, "Unknown chat command");
            Ok(InteractionResponse::message(format!("❌ Unknown command `{other}`.")))
        }
    };

    result.unwrap_or_else(|err| {
        let app_err: AppError = err.into();
        if app_err.code.category() == shared::error::ErrorCategory::System {
            InteractionResponse::message("❌ Something went wrong while handling your request.")
        } else {
            InteractionResponse::message(format!("❌ {}", app_err.message))
        }
    })
}

fn required<'a>(data: &'a CommandData, name: &str) -> Result<&'a str, AppError> {
    data.option_str(name)
        .ok_or_else(|| AppError::validation(format!("Option `{name}` is required")))
}

async fn create_account(
    pool: &SqlitePool,
    invoker: &DiscordUser,
    data: &CommandData,
) -> ServiceResult<InteractionResponse> {
    let email = normalize_email(required(data, "email")?);
    validate_email(&email)?;
    let full_name = required(data, "full-name")?.to_owned();
    validate_text_len(&full_name, "full-name", 2, MAX_FULL_NAME_LEN)?;
    let phone = data.option_str("phone").map(str::to_owned);
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }

    let exists = || {
        AppError::with_message(
            ErrorCode::ChatAccountExists,
            "You already have an account, or this email is already in use",
        )
    };
    if chat_repo::account_exists(pool, &invoker.id, &email).await? {
        return Err(exists().into());
    }

    let temp_password = generate_temp_password(TEMP_PASSWORD_LEN);
    let password_hash = hash_password(&temp_password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let account = NewChatAccount {
        discord_id: invoker.id.clone(),
        username: invoker.username.clone(),
        email,
        password_hash,
        full_name,
        phone,
    };
    let account = match chat_repo::create_account(pool, &account, now_millis()).await {
        Ok(account) => account,
        Err(RepoError::Duplicate(_)) => return Err(exists().into()),
        Err(e) => return Err(ServiceError::from(e)),
    };

    tracing::info!(account_id = account.id, discord_id = %account.discord_id, "Chat account created");

    Ok(InteractionResponse::embed(
        Embed::new("🎉 Account created", COLOR_INFO)
            .description("Your Harvest account is ready.")
            .field("👤 Name", &account.full_name, true)
            .field("📧 Email", &account.email, true)
            .field("🔑 Temporary password", format!("`{temp_password}`"), false)
            .field(
                "🔐 Sign in",
                "Sign in with your email and this password at /api/discord/login.",
                false,
            )
            .footer("Harvest - fresh from the farm"),
    ))
}

async fn my_account(pool: &SqlitePool, invoker: &DiscordUser) -> ServiceResult<InteractionResponse> {
    let account = chat_repo::find_account_by_discord_id(pool, &invoker.id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::ChatAccountRequired,
                "No account found. Use `/create-account` to create one.",
            )
        })?;

    Ok(InteractionResponse::embed(
        Embed::new("👤 My Harvest account", COLOR_INFO)
            .field("📧 Email", &account.email, true)
            .field("👤 Name", &account.full_name, true)
            .field("📞 Phone", account.phone.as_deref().unwrap_or("Not provided"), true)
            .field("📅 Created", format_date_millis(account.created_at), true)
            .field(
                "🟢 Status",
                if account.is_active { "Active" } else { "Inactive" },
                true,
            )
            .footer("Harvest"),
    ))
}

async fn order(
    pool: &SqlitePool,
    invoker: &DiscordUser,
    data: &CommandData,
) -> ServiceResult<InteractionResponse> {
    let account = chat_repo::find_account_by_discord_id(pool, &invoker.id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::ChatAccountRequired,
                "Create an account with `/create-account` before ordering.",
            )
        })?;

    let products = required(data, "products")?;
    let lines = parse_product_list(products)?;
    let zone: DeliveryZone = required(data, "delivery-zone")?
        .parse::<DeliveryZone>()
        .map_err(|e| AppError::with_message(ErrorCode::InvalidDeliveryZone, e))?;
    let address = required(data, "address")?;
    validate_text_len(address, "address", 2, MAX_ADDRESS_LEN)?;

    let q = quote(&lines, zone);
    let new_order = NewChatOrder {
        account_id: account.id,
        discord_id: invoker.id.clone(),
        products: products.to_owned(),
        unit_count: q.unit_count,
        products_total: q.products_total as f64,
        delivery_zone: zone,
        delivery_cost: q.delivery_cost as f64,
        total_amount: q.total as f64,
        delivery_address: address.to_owned(),
    };
    let saved = chat_repo::create_order(pool, &new_order, now_millis()).await?;

    tracing::info!(
        chat_order_id = saved.id,
        account_id = account.id,
        zone = %zone,
        total = q.total,
        "Chat order recorded"
    );

    Ok(InteractionResponse::embed(
        Embed::new("🛒 Order recorded", COLOR_SUCCESS)
            .description("Your order has been recorded.")
            .field("📦 Products", products, false)
            .field("📍 Delivery zone", zone.display_name(), true)
            .field("🏠 Address", address, true)
            .field("💰 Products", format!("${}", q.products_total), true)
            .field("🚚 Delivery", format!("${}", q.delivery_cost), true)
            .field("💳 Total", format!("${}", q.total), true)
            .field("📋 Order no.", format!("#{}", saved.id), true)
            .footer("We will contact you to arrange delivery"),
    ))
}

fn products() -> InteractionResponse {
    InteractionResponse::embed(
        Embed::new("🛒 Available products", COLOR_INFO)
            .description(format!(
                "Every product sells at the single price of **${CHAT_UNIT_PRICE}**"
            ))
            .field(
                "🍎 Fruit",
                "🍋 Lemon\n🍎 Apple\n🥥 Coconut\n🍍 Pineapple\n🍓 Strawberry\n🍈 Melon\n🍉 Watermelon",
                true,
            )
            .field(
                "🥕 Vegetables",
                "🫑 Bell pepper\n🍅 Tomato\n🥬 Lettuce\n🥒 Gherkin\n🌶️ Chili",
                true,
            )
            .field("🌿 Herbs", "🌿 Mint\n🍃 Hops", true)
            .footer("Use /order to place an order"),
    )
}

fn deliveries() -> InteractionResponse {
    let mut embed = Embed::new("🚚 Delivery zones and fees", COLOR_INFO)
        .description("Delivery fees are added to the order total");
    for zone in DeliveryZone::ALL {
        embed = embed.field(zone.display_name(), format!("**${}**", zone.delivery_cost()), true);
    }
    InteractionResponse::embed(embed.footer("Harvest"))
}

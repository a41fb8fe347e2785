use crate::domain::ids::{ProductId, SkuId, UserId};
use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Add,
    Update,
    Remove,
    Checkout,
    Wish,
    Unwish,
    Cancel,
}

/// A raw `command, user, target, quantity` row.
#[derive(Debug, Deserialize)]
struct CommandRecord {
    command: CommandType,
    user: u64,
    target: Option<u64>,
    quantity: Option<u32>,
}

/// A storefront action on behalf of one user.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(try_from = "CommandRecord")]
pub enum Command {
    AddLine {
        user: UserId,
        sku: SkuId,
        quantity: u32,
    },
    UpdateLine {
        user: UserId,
        sku: SkuId,
        quantity: u32,
    },
    RemoveLine {
        user: UserId,
        sku: SkuId,
    },
    Checkout {
        user: UserId,
    },
    Wish {
        user: UserId,
        product: ProductId,
    },
    Unwish {
        user: UserId,
        product: ProductId,
    },
    /// `ordinal` counts the user's orders placed in this run, starting at 1.
    Cancel {
        user: UserId,
        ordinal: usize,
    },
}

impl Command {
    pub fn user(&self) -> UserId {
        match *self {
            Command::AddLine { user, .. }
            | Command::UpdateLine { user, .. }
            | Command::RemoveLine { user, .. }
            | Command::Checkout { user }
            | Command::Wish { user, .. }
            | Command::Unwish { user, .. }
            | Command::Cancel { user, .. } => user,
        }
    }
}

impl TryFrom<CommandRecord> for Command {
    type Error = StoreError;

    fn try_from(record: CommandRecord) -> std::result::Result<Self, Self::Error> {
        let user = UserId(record.user);
        let target = |what: &str| {
            record
                .target
                .ok_or_else(|| StoreError::validation(format!("{what} is required")))
        };
        let quantity = || {
            record
                .quantity
                .ok_or_else(|| StoreError::validation("quantity is required"))
        };

        Ok(match record.command {
            CommandType::Add => Command::AddLine {
                user,
                sku: SkuId(target("sku")?),
                quantity: quantity()?,
            },
            CommandType::Update => Command::UpdateLine {
                user,
                sku: SkuId(target("sku")?),
                quantity: quantity()?,
            },
            CommandType::Remove => Command::RemoveLine {
                user,
                sku: SkuId(target("sku")?),
            },
            CommandType::Checkout => Command::Checkout { user },
            CommandType::Wish => Command::Wish {
                user,
                product: ProductId(target("product")?),
            },
            CommandType::Unwish => Command::Unwish {
                user,
                product: ProductId(target("product")?),
            },
            CommandType::Cancel => {
                let ordinal = target("order")?;
                if ordinal == 0 {
                    return Err(StoreError::validation("order ordinals start at 1"));
                }
                let ordinal = usize::try_from(ordinal)
                    .map_err(|_| StoreError::validation("order ordinal out of range"))?;
                Command::Cancel { user, ordinal }
            }
        })
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It handles whitespace trimming and flexible record lengths automatically, so
/// `checkout` rows may omit the trailing columns.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StoreError::from))
    }
}

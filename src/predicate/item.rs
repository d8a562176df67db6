//! Item predicates: holding, owning, clicking with, or using an item on a
//! keyhole block.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use super::{args, complete, EvalContext, Predicate, PredicateError};
use crate::core::types::{Actor, ActorId, BlockPos, Tri};
use crate::host::WorldHost;

/// An actor using an item, as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub actor: ActorId,
    pub world: String,
    /// Item in the actor's hand while interacting
    pub item: Option<String>,
    /// Block the actor used the item on
    pub block: Option<BlockPos>,
}

impl Interaction {
    pub fn click(actor: ActorId, world: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            actor,
            world: world.into(),
            item: Some(item.into()),
            block: None,
        }
    }

    pub fn on_block(mut self, block: BlockPos) -> Self {
        self.block = Some(block);
        self
    }

    fn holds(&self, item: &str) -> bool {
        self.item
            .as_deref()
            .is_some_and(|held| held.eq_ignore_ascii_case(item))
    }
}

/// Opens the door while the actor holds the item in hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemHolding {
    pub item: String,
    pub amount: u32,
    pub consume: bool,
}

impl ItemHolding {
    pub fn new(item: impl Into<String>, amount: u32, consume: bool) -> Self {
        Self {
            item: item.into(),
            amount,
            consume,
        }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        match ctx.actor {
            Some(actor) => Tri::from_bool(ctx.services.world.has_item_in_hand(
                actor.id,
                &self.item,
                self.amount,
            )),
            None => Tri::Abstain,
        }
    }

    pub(super) fn consume(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        if self.consume && !world.take_from_hand(actor.id, &self.item, self.amount) {
            tracing::warn!("Could not take {}x {} from hand of {:?}", self.amount, self.item, actor.id);
        }
    }

    pub(super) fn describe(&self) -> String {
        describe_item("hold", &self.item, self.amount, self.consume)
    }
}

/// Opens the door while the actor carries the item anywhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOwning {
    pub item: String,
    pub amount: u32,
    pub consume: bool,
}

impl ItemOwning {
    pub fn new(item: impl Into<String>, amount: u32, consume: bool) -> Self {
        Self {
            item: item.into(),
            amount,
            consume,
        }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        match ctx.actor {
            Some(actor) => Tri::from_bool(ctx.services.world.has_item_in_inventory(
                actor.id,
                &self.item,
                self.amount,
            )),
            None => Tri::Abstain,
        }
    }

    pub(super) fn consume(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        if self.consume && !world.take_from_inventory(actor.id, &self.item, self.amount) {
            tracing::warn!("Could not take {}x {} from inventory of {:?}", self.amount, self.item, actor.id);
        }
    }

    pub(super) fn describe(&self) -> String {
        describe_item("own", &self.item, self.amount, self.consume)
    }
}

/// Opens the door for actors who clicked with the item since the last cycle
/// and still hold it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemClick {
    pub item: String,
    pub amount: u32,
    pub consume: bool,
    #[serde(skip)]
    clicked: AHashSet<ActorId>,
}

impl ItemClick {
    pub fn new(item: impl Into<String>, amount: u32, consume: bool) -> Self {
        Self {
            item: item.into(),
            amount,
            consume,
            clicked: AHashSet::new(),
        }
    }

    pub fn record_click(&mut self, interaction: &Interaction) -> bool {
        if !interaction.holds(&self.item) {
            return false;
        }
        self.clicked.insert(interaction.actor);
        true
    }

    pub fn has_clicked(&self, actor: ActorId) -> bool {
        self.clicked.contains(&actor)
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        let holds = ctx
            .services
            .world
            .has_item_in_hand(actor.id, &self.item, self.amount);
        Tri::from_bool(holds && self.clicked.contains(&actor.id))
    }

    pub(super) fn consume(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        if self.consume && !world.take_from_hand(actor.id, &self.item, self.amount) {
            tracing::warn!("Could not take {}x {} from hand of {:?}", self.amount, self.item, actor.id);
        }
    }

    pub(super) fn reset(&mut self) {
        self.clicked.clear();
    }

    pub(super) fn describe(&self) -> String {
        describe_item("click with", &self.item, self.amount, self.consume)
    }
}

/// Opens the door for actors who used the item on a keyhole block since
/// the last cycle and still hold it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBlock {
    pub item: String,
    pub amount: u32,
    /// The keyhole, in the door's world
    pub position: BlockPos,
    pub consume: bool,
    #[serde(skip)]
    clicked: AHashSet<ActorId>,
}

impl ItemBlock {
    pub fn new(item: impl Into<String>, amount: u32, position: BlockPos, consume: bool) -> Self {
        Self {
            item: item.into(),
            amount,
            position,
            consume,
            clicked: AHashSet::new(),
        }
    }

    pub fn record_click(&mut self, interaction: &Interaction, door_world: &str) -> bool {
        if interaction.block != Some(self.position)
            || interaction.world != door_world
            || !interaction.holds(&self.item)
        {
            return false;
        }
        self.clicked.insert(interaction.actor);
        true
    }

    pub fn has_clicked(&self, actor: ActorId) -> bool {
        self.clicked.contains(&actor)
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        let holds = ctx
            .services
            .world
            .has_item_in_hand(actor.id, &self.item, self.amount);
        Tri::from_bool(holds && self.clicked.contains(&actor.id))
    }

    pub(super) fn consume(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        if self.consume && !world.take_from_inventory(actor.id, &self.item, self.amount) {
            tracing::warn!("Could not take {}x {} from inventory of {:?}", self.amount, self.item, actor.id);
        }
    }

    pub(super) fn reset(&mut self) {
        self.clicked.clear();
    }

    pub(super) fn describe(&self) -> String {
        format!(
            "{} at {},{},{}",
            describe_item("use", &self.item, self.amount, self.consume),
            self.position.x,
            self.position.y,
            self.position.z
        )
    }
}

fn describe_item(verb: &str, item: &str, amount: u32, consume: bool) -> String {
    format!(
        "{} {}x {}{}",
        verb,
        amount,
        item,
        if consume { " (consumed)" } else { "" }
    )
}

fn item_args<'a>(args: &[&'a str]) -> Result<(&'a str, u32), PredicateError> {
    let item = args::required(args, 0, "item")?;
    let amount = args::amount(args::required(args, 1, "amount")?)?;
    Ok((item, amount))
}

pub(super) fn holding_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let (item, amount) = item_args(args)?;
    let consume = args::flag(args, 2, "consume")?;
    Ok(Predicate::ItemHolding(ItemHolding::new(item, amount, consume)))
}

pub(super) fn owning_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let (item, amount) = item_args(args)?;
    let consume = args::flag(args, 2, "consume")?;
    Ok(Predicate::ItemOwning(ItemOwning::new(item, amount, consume)))
}

pub(super) fn click_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let (item, amount) = item_args(args)?;
    let consume = args::flag(args, 2, "consume")?;
    Ok(Predicate::ItemClick(ItemClick::new(item, amount, consume)))
}

pub(super) fn block_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let (item, amount) = item_args(args)?;
    let position = args::block(args::required(args, 2, "keyhole")?, "keyhole")?;
    let consume = args::flag(args, 3, "consume")?;
    Ok(Predicate::ItemBlock(ItemBlock::new(item, amount, position, consume)))
}

pub(super) fn item_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("item"),
        (1, _) => complete::hint("amount 1-64"),
        (2, current) => complete::flag(current, "consume"),
        _ => Vec::new(),
    }
}

pub(super) fn block_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("item"),
        (1, _) => complete::hint("amount 1-64"),
        (2, _) => complete::hint("x,y,z"),
        (3, current) => complete::flag(current, "consume"),
        _ => Vec::new(),
    }
}

use sealed::Sealed;

use super::{Entity, column::Column};

/// A one-to-one relation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneToOne;

/// A many-to-one relation (owning side).
#[derive(Debug, Default, Clone, Copy)]
pub struct ManyToOne;

/// A one-to-many relation (non-owning side).
#[derive(Debug, Default, Clone, Copy)]
pub struct OneToMany;

impl Relation for OneToOne {
    type InverseEquivalent = Self;
}

impl InverseRelation for OneToOne {
    type ForwardEquivalent = Self;
}

impl Relation for ManyToOne {
    type InverseEquivalent = OneToMany;
}

impl InverseRelation for OneToMany {
    type ForwardEquivalent = ManyToOne;
}

/// Trait defining the owning side of a relation.
///
/// Sealed trait, not meant for manual implementation.
pub trait Relation: Sealed {
    type InverseEquivalent: InverseRelation;
}

/// Trait defining the non-owning side of a relation.
///
/// Sealed trait, not meant for manual implementation.
pub trait InverseRelation: Sealed {
    type ForwardEquivalent: Relation;
}

/// The load state of a relationship field. Relationships are never loaded behind the
/// caller's back: a field stays `Unresolved` until a fetch join or an explicit
/// [`resolve`](crate::query::fetch::resolve) fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    Unresolved,
    Resolved(T),
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self::Unresolved
    }
}

impl<T> Loaded<T> {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The loaded value, or `None` while unresolved.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(e) => Some(e),
            Self::Unresolved => None,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Resolved(e) => Some(e),
            Self::Unresolved => None,
        }
    }
}

/// The owning side (= the side with the foreign key stored in its table) of a database relation.
///
/// Implementing this trait will automatically implement [`InverseRelated`] for the other side.
pub trait Related<R>: Entity
where
    R: Entity,
{
    /// The column holding the foreign key to the other entity's primary key.
    type FkColumn: Column<Entity = Self>;

    /// The relation type, i.e. how many other entities are expected to be on the other side.
    type RelationType: Relation;

    /// Name of the relationship field on this entity's model.
    const PATH: &'static str;

    /// The relationship field holding the other side.
    fn relation_mut(model: &mut Self::Model) -> &mut Loaded<Option<R::Model>>;
}

/// The non-owning or inverse side of a database relation.
///
/// This trait is auto implemented for the opposing sides whenever [`Related`] is implemented.
pub trait InverseRelated<R>: Entity
where
    R: Entity,
{
    /// The relation type, i.e. how many other entities are expected to be on the other side.
    ///
    /// Note that this is meant to be from the perspective of _this_ entity, so if the other entity
    /// has a ManyToOne relation, this would be a OneToMany relation.
    type InverseRelationType: InverseRelation;
}

impl<E, R> InverseRelated<E> for R
where
    E: Related<R>,
    R: Entity,
{
    type InverseRelationType = <E::RelationType as Relation>::InverseEquivalent;
}

/// A collection field on the inverse side of a many-to-one relation, e.g. a team's members.
pub trait HasMany<R>: InverseRelated<R, InverseRelationType = OneToMany>
where
    R: Related<Self>,
{
    /// Name of the collection field on this entity's model.
    const PATH: &'static str;

    fn collection_mut(model: &mut Self::Model) -> &mut Loaded<Vec<R::Model>>;
}

mod sealed {
    use super::{ManyToOne, OneToMany, OneToOne};

    pub trait Sealed {}

    impl Sealed for OneToOne {}
    impl Sealed for OneToMany {}
    impl Sealed for ManyToOne {}
}

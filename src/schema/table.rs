use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use bimap::BiMap;
use string_cache::DefaultAtom;

use super::field::{Field, RecordSchema};

pub type TokenId = u8;

/// A patch token the schema knows how to lay out. `declared_size` is the size of the token's own
/// fields and excludes the 8-byte `Token`/`Size` item header every token starts with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
  pub id            : TokenId,
  pub name          : DefaultAtom,
  pub declared_size : u32,
  pub fields        : Vec<Field>,
}

impl Token {
  pub fn new(id: TokenId, name: &str, record: RecordSchema) -> Token {
    Token{
      id,
      name          : DefaultAtom::from(name),
      declared_size : record.total_size,
      fields        : record.fields
    }
  }
}

impl Display for Token{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({}) [{} bytes]", self.name, self.id, self.declared_size)
  }
}

/**
  The mapping from token id to `Token`. Besides the id-keyed table, a name/id `BiMap` is kept so
  that a block name read back from PTM text can be checked against the id it carries.

  The table is built once per decode or encode session and is read-only afterward.
*/
#[derive(Clone, Debug, Default)]
pub struct TokenTable {
  tokens : BTreeMap<TokenId, Token>,
  names  : BiMap<DefaultAtom, TokenId>,
}

impl TokenTable {

  pub fn new() -> TokenTable {
    TokenTable::default()
  }

  /// Inserts the token, returning the token it displaced if the id was already taken. Colliding
  /// ids only happen with malformed schema text; the later declaration wins.
  pub fn insert(&mut self, token: Token) -> Option<Token> {
    // `BiMap::insert` evicts both the old pair for this name and the old pair for this id.
    self.names.insert(token.name.clone(), token.id);
    self.tokens.insert(token.id, token)
  }

  /// Looks up a token by the 32-bit id found in a binary. Ids beyond a byte are never known.
  pub fn get(&self, id: u32) -> Option<&Token> {
    match TokenId::try_from(id) {
      Ok(id) => self.tokens.get(&id),
      Err(_) => None
    }
  }

  pub fn id_of(&self, name: &str) -> Option<TokenId> {
    self.names.get_by_left(&DefaultAtom::from(name)).copied()
  }

  pub fn name_of(&self, id: TokenId) -> Option<&DefaultAtom> {
    self.names.get_by_right(&id)
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Tokens in ascending id order.
  pub fn iter(&self) -> impl Iterator<Item = &Token> {
    self.tokens.values()
  }
}

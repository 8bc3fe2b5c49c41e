/*!
  Line grammars for the C-like declarations a schema is written in. Schema text is header source,
  so the grammars are deliberately forgiving: anything that is not a field declaration or an
  enumeration entry is simply not matched, and the loader skips it.

  A field declaration looks like
  ```text
      uint32_t   KernelHeapSize;      // optional comment
      uint32_t   Reserved[ 3 ];
  ```
  and an enumeration entry like
  ```text
      PATCH_TOKEN_THREAD_PAYLOAD,          // 22  @SPatchThreadPayload@
      PATCH_TOKEN_STRING = 28,
  ```
*/

use nom::{
  branch::alt,
  bytes::complete::{tag, take_until},
  character::complete::{
    alpha1,
    alphanumeric1,
    char as one_char,
    digit1,
    hex_digit1,
    space0,
    space1
  },
  combinator::{map_res, opt, recognize, rest},
  multi::many0_count,
  sequence::{delimited, pair, preceded, terminated, tuple},
  IResult
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDeclaration<'a> {
  pub type_name : &'a str,
  pub name      : &'a str,
  /// The text between the brackets of an array declaration, if any.
  pub array_len : Option<&'a str>,
}

impl<'a> FieldDeclaration<'a> {
  /// Integer-typed declarations are the only ones that carry a size the codec can use. Any other
  /// type name (`float`, a nested record) is not a field of the binary layout.
  pub fn is_integer(&self) -> bool {
    self.type_name.contains("int")
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumEntry<'a> {
  pub name       : &'a str,
  /// An explicit `= value` assignment.
  pub assigned   : Option<u64>,
  /// The number leading the trailing comment, which is how the token headers document ids.
  pub documented : Option<u64>,
  /// The companion record named between `@` signs in the trailing comment.
  pub record     : Option<&'a str>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
  recognize(
    pair(
      alt((alpha1, tag("_"))),
      many0_count(alt((alphanumeric1, tag("_"))))
    )
  )(input)
}

fn integer(input: &str) -> IResult<&str, u64> {
  alt((
    map_res(preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: &str| u64::from_str_radix(digits, 16)),
    map_res(digit1, |digits: &str| digits.parse::<u64>())
  ))(input)
}

fn field_declaration_p(input: &str) -> IResult<&str, FieldDeclaration> {
  let (input, (_, type_name, _, name, _, array_len, _, _)) =
    tuple((
      space0,
      identifier,
      space1,
      identifier,
      space0,
      opt(delimited(one_char('['), take_until("]"), one_char(']'))),
      space0,
      one_char(';')
    ))(input)?;

  Ok((input, FieldDeclaration{ type_name, name, array_len }))
}

/// Recognizes `<type> <name>;` or `<type> <name>[<len>];` at the start of a line.
pub fn parse_field_declaration(line: &str) -> Option<FieldDeclaration> {
  match field_declaration_p(line) {
    Ok((_rest, declaration)) => Some(declaration),
    Err(_) => None
  }
}

/// Extracts the documented id and the `@Record@` annotation from an entry's trailing comment.
fn entry_comment(comment: &str) -> (Option<u64>, Option<&str>) {
  let documented =
    match preceded(space0::<&str, nom::error::Error<&str>>, integer)(comment) {
      Ok((_, value)) => Some(value),
      Err(_) => None
    };

  let record =
    match preceded(
      pair(take_until::<_, _, nom::error::Error<&str>>("@"), one_char('@')),
      terminated(identifier, one_char('@'))
    )(comment) {
      Ok((_, name)) => Some(name),
      Err(_) => None
    };

  (documented, record)
}

fn enum_entry_p(input: &str) -> IResult<&str, EnumEntry> {
  let (input, (_, name, _, assigned, _, _, _, comment)) =
    tuple((
      space0,
      identifier,
      space0,
      opt(preceded(pair(one_char('='), space0), integer)),
      space0,
      opt(one_char(',')),
      space0,
      opt(preceded(tag("//"), rest))
    ))(input)?;

  let (documented, record) =
    match comment {
      Some(text) => entry_comment(text),
      None => (None, None)
    };

  Ok((input, EnumEntry{ name, assigned, documented, record }))
}

/// Recognizes one enumerator of an `enum` body, with its optional value and trailing comment.
pub fn parse_enum_entry(line: &str) -> Option<EnumEntry> {
  match enum_entry_p(line) {
    // The entry must account for the whole line; `{` or `enum X` lines are not entries.
    Ok((rest, entry)) if rest.trim().is_empty() && entry.name != "enum" => Some(entry),
    _ => None
  }
}

/// Parses the length of an array field, e.g. the ` 3 ` of `Reserved[ 3 ]`.
pub fn parse_array_len(text: &str) -> Option<u64> {
  match delimited(space0::<&str, nom::error::Error<&str>>, integer, space0)(text) {
    Ok(("", value)) => Some(value),
    _ => None
  }
}

/**
  Finds the first line containing `needle` followed by whitespace or the end of the line. The
  boundary check keeps `struct SKernelBinaryHeader` from matching the declaration of
  `struct SKernelBinaryHeaderCommon`.
*/
pub fn find_declaration<S: AsRef<str>>(lines: &[S], needle: &str) -> Option<usize> {
  lines.iter().position(|line| {
    let line = line.as_ref();
    line.match_indices(needle).any(|(start, _)| {
      match line[start + needle.len()..].chars().next() {
        None    => true,
        Some(c) => c.is_whitespace()
      }
    })
  })
}

/// A line that closes a record or enumeration body.
pub fn is_closing_line(line: &str) -> bool {
  line.contains("};")
}

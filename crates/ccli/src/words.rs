//! Shell-style word splitting.
//!
//! Lines typed at the prompt are split into words the way a shell would for
//! a simple command: whitespace separates words, `'` and `"` group text
//! (including whitespace) into one word, and a backslash takes the next
//! character literally. Quotes and escaping backslashes are removed from the
//! resulting words.
//!
//! An optional delimiter (such as `;` or `&&`) ends the command early; the
//! text after it is handed back so the caller can split the next command.

use crate::error::Result;

/// Result of splitting one command off a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    /// The words of the command, unquoted and unescaped.
    pub words: Vec<String>,
    /// Text following the delimiter that ended this command, if any.
    pub rest: Option<&'a str>,
}

/// Split `line` into words, with no command delimiter.
///
/// ```
/// let words = ccli::split_words(r#"run  for you\'r 'life\!'"#).unwrap();
/// assert_eq!(words, ["run", "for", "you'r", "life!"]);
/// ```
pub fn split_words(line: &str) -> Result<Vec<String>> {
    split_command(line, None).map(|split| split.words)
}

/// Split the first command off `line`.
///
/// When `delimiter` is given and appears outside quotes and unescaped, the
/// command ends there and the remainder of the line is returned in
/// [`Split::rest`]. An empty delimiter is treated as no delimiter.
pub fn split_command<'a>(line: &'a str, delimiter: Option<&str>) -> Result<Split<'a>> {
    let delimiter = delimiter.filter(|d| !d.is_empty());
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if quote.is_none()
            && let Some(delim) = delimiter
            && line[i..].starts_with(delim)
        {
            if in_word {
                push_word(&mut words, std::mem::take(&mut word))?;
            }
            return Ok(Split {
                words,
                rest: Some(&line[i + delim.len()..]),
            });
        }

        match c {
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some((_, next)) => push_char(&mut word, next)?,
                    // A trailing backslash has nothing to escape
                    None => push_char(&mut word, '\\')?,
                }
            }
            '\'' | '"' => {
                in_word = true;
                match quote {
                    None => quote = Some(c),
                    Some(q) if q == c => quote = None,
                    Some(_) => push_char(&mut word, c)?,
                }
            }
            c if c.is_whitespace() && quote.is_none() => {
                if in_word {
                    push_word(&mut words, std::mem::take(&mut word))?;
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                push_char(&mut word, c)?;
            }
        }
    }

    if in_word {
        push_word(&mut words, word)?;
    }

    Ok(Split { words, rest: None })
}

fn push_char(word: &mut String, c: char) -> Result<()> {
    word.try_reserve(c.len_utf8())?;
    word.push(c);
    Ok(())
}

fn push_word(words: &mut Vec<String>, word: String) -> Result<()> {
    words.try_reserve(1)?;
    words.push(word);
    Ok(())
}

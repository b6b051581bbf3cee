use crate::error::SortError;
use crate::key::extract_key;

/// Defines the sort field of a delimited record.
///
/// The Field definition is used to extract the key of every record that takes part in a
/// comparison.
///
/// # Examples
/// ```
/// // sort by the third field of a semicolon separated file
/// use csv_file_sort::field::Field;
/// let field = Field::new(2)
///     .with_separator(';')
///     .with_quote('\'');
/// ```
#[derive(Clone, Debug)]
pub struct Field {
    index: usize,
    separator: char,
    quote: char,
}

impl Field {
    /// Create a new [Field]
    ///
    /// # Arguments
    /// * `index` - the index of the field, starting at 0.
    ///
    /// The default separator is ',' and the default quote is '"'
    pub fn new(index: usize) -> Field {
        Field {
            index,
            separator: ',',
            quote: '"',
        }
    }

    /// Get the index for this field.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the field separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Get the quote character.
    pub fn quote(&self) -> char {
        self.quote
    }

    /// Specify the index for this field starting at 0.
    pub fn with_index(mut self, index: usize) -> Field {
        self.index = index;
        self
    }

    /// Specify the field separator.
    pub fn with_separator(mut self, separator: char) -> Field {
        self.separator = separator;
        self
    }

    /// Specify the quote character. Separators inside a quoted field are part of the field.
    pub fn with_quote(mut self, quote: char) -> Field {
        self.quote = quote;
        self
    }

    /// Extract the key of this field from `line`. The line must not contain its terminator.
    ///
    /// # Examples
    /// ```
    /// use csv_file_sort::field::Field;
    /// let field = Field::new(1);
    /// assert_eq!(field.key("7,\"b,c\",d").unwrap(), "b,c");
    /// ```
    pub fn key(&self, line: &str) -> Result<String, SortError> {
        extract_key(line, self.index, self.separator, self.quote)
    }
}

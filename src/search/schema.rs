//! Tantivy schema for indexed records
//!
//! Every record type shares one schema. Title and content are stemmed for
//! natural language matching; identity and record type are stored raw so they
//! can be used as delete keys and grouping keys.

use tantivy::{
    schema::{Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions},
    tokenizer::{
        AlphaNumOnlyFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
        TextAnalyzer, TokenizerManager,
    },
};

/// Tokenizer name constants for zero-allocation lookups
const RECORD_TEXT_TOKENIZER: &str = "record_text";
const RECORD_NAME_TOKENIZER: &str = "record_name";

/// Tokens longer than this are dropped instead of indexed
const MAX_TOKEN_LEN: usize = 40;

/// Field names, in schema order
pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_DOCTYPE: &str = "doctype";
pub const FIELD_EXTRAS: &str = "fields";

/// Search schema with resolved field handles
#[derive(Debug, Clone)]
pub struct SearchSchema {
    pub schema: Schema,
    /// `"{record_type}-{identity}"`, the replace/delete key
    pub id: Field,
    pub name: Field,
    pub title: Field,
    pub content: Field,
    pub doctype: Field,
    /// JSON-encoded extras, stored only
    pub extras: Field,
}

impl SearchSchema {
    /// Build the schema with its field options
    #[must_use]
    pub fn build() -> Self {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_text_field(FIELD_ID, STRING | STORED);

        let name_options = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(RECORD_NAME_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let name = schema_builder.add_text_field(FIELD_NAME, name_options);

        let stemmed_options = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(RECORD_TEXT_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let title = schema_builder.add_text_field(FIELD_TITLE, stemmed_options.clone());
        let content = schema_builder.add_text_field(FIELD_CONTENT, stemmed_options);

        // Raw term: grouping key, never stemmed
        let doctype = schema_builder.add_text_field(FIELD_DOCTYPE, STRING | STORED);

        let extras = schema_builder.add_text_field(FIELD_EXTRAS, STORED);

        SearchSchema {
            schema: schema_builder.build(),
            id,
            name,
            title,
            content,
            doctype,
            extras,
        }
    }

    /// Register the analyzers this schema's fields reference
    pub fn register_tokenizers(tokenizer_manager: &TokenizerManager) {
        let text_analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(AlphaNumOnlyFilter)
            .filter(Stemmer::new(Language::English))
            .build();
        tokenizer_manager.register(RECORD_TEXT_TOKENIZER, text_analyzer);

        let name_analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build();
        tokenizer_manager.register(RECORD_NAME_TOKENIZER, name_analyzer);
    }

    /// Fields free-text queries are parsed against
    #[must_use]
    pub fn query_fields(&self) -> Vec<Field> {
        vec![self.title, self.content, self.name]
    }

    /// Check an existing index schema matches this one field for field
    #[must_use]
    pub fn is_compatible_with(&self, other: &Schema) -> bool {
        if other.num_fields() != self.schema.num_fields() {
            return false;
        }
        self.schema.fields().all(|(_, entry)| {
            other
                .get_field(entry.name())
                .map(|field| other.get_field_entry(field) == entry)
                .unwrap_or(false)
        })
    }
}

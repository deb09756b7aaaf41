//! Source file catalog
//!
//! Every source is one gzip-compressed, tab-separated snapshot with a header
//! row. The column lists below are the fixed layouts the loader expects; the
//! header of each file is checked against them before any table is touched.

use crate::record::{ColumnDef, RecordShape};
use crate::value::ColumnType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    NameBasics,
    TitleBasics,
    TitleEpisode,
    TitleAkas,
    TitleCrew,
    TitlePrincipals,
    TitleRatings,
}

impl SourceId {
    /// All sources, in the order they are usually shipped
    pub const ALL: [SourceId; 7] = [
        SourceId::NameBasics,
        SourceId::TitleBasics,
        SourceId::TitleEpisode,
        SourceId::TitleAkas,
        SourceId::TitleCrew,
        SourceId::TitlePrincipals,
        SourceId::TitleRatings,
    ];

    /// File name used when the config does not override it
    pub fn default_file(self) -> &'static str {
        match self {
            SourceId::NameBasics => "name.basics.tsv.gz",
            SourceId::TitleBasics => "title.basics.tsv.gz",
            SourceId::TitleEpisode => "title.episode.tsv.gz",
            SourceId::TitleAkas => "title.akas.tsv.gz",
            SourceId::TitleCrew => "title.crew.tsv.gz",
            SourceId::TitlePrincipals => "title.principals.tsv.gz",
            SourceId::TitleRatings => "title.ratings.tsv.gz",
        }
    }

    /// Ordered, typed columns of the file
    pub fn columns(self) -> Vec<ColumnDef> {
        use ColumnType::{Float, Int, Text};
        let cols: &[(&str, ColumnType)] = match self {
            SourceId::NameBasics => &[
                ("nconst", Text),
                ("primaryName", Text),
                ("birthYear", Int),
                ("deathYear", Int),
                ("primaryProfession", Text),
                ("knownForTitles", Text),
            ],
            SourceId::TitleBasics => &[
                ("tconst", Text),
                ("titleType", Text),
                ("primaryTitle", Text),
                ("originalTitle", Text),
                ("isAdult", Int),
                ("startYear", Int),
                ("endYear", Int),
                ("runtimeMinutes", Int),
                ("genres", Text),
            ],
            SourceId::TitleEpisode => &[
                ("tconst", Text),
                ("parentTconst", Text),
                ("seasonNumber", Int),
                ("episodeNumber", Int),
            ],
            SourceId::TitleAkas => &[
                ("titleId", Text),
                ("ordering", Int),
                ("title", Text),
                ("region", Text),
                ("language", Text),
                ("types", Text),
                ("attributes", Text),
                ("isOriginalTitle", Int),
            ],
            SourceId::TitleCrew => &[("tconst", Text), ("directors", Text), ("writers", Text)],
            SourceId::TitlePrincipals => &[
                ("tconst", Text),
                ("ordering", Int),
                ("nconst", Text),
                ("category", Text),
                ("job", Text),
                ("characters", Text),
            ],
            SourceId::TitleRatings => &[
                ("tconst", Text),
                ("averageRating", Float),
                ("numVotes", Int),
            ],
        };
        cols.iter()
            .map(|(name, ty)| ColumnDef::new(*name, *ty))
            .collect()
    }

    /// Record shape of the file for the given delimiter and null token
    pub fn shape(self, delimiter: u8, null_token: &str) -> RecordShape {
        RecordShape::new(self.columns(), delimiter, null_token)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.default_file().trim_end_matches(".tsv.gz");
        f.write_str(name)
    }
}

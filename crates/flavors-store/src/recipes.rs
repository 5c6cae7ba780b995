//! Save, check and search [`Recipe`] records.

use rusqlite::{params, Connection, TransactionBehavior};

use crate::database::Database;
use crate::error::{map_insert_error, Result, StoreError};
use crate::models::{Recipe, RecipeId, RecipeInput, RecipeSummary, SubmitOutcome};

const RECIPE_COLUMNS: &str = "id, name, festival, dish, language, ingredients, instructions, \
                              image, latitude, longitude, video, audio";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new recipe and return its id.
    ///
    /// The row is committed before this returns.  Does not validate the
    /// input; a pair that is already taken fails with
    /// [`StoreError::Duplicate`].
    pub fn save(&self, recipe: &RecipeInput) -> Result<RecipeId> {
        let id = insert_recipe(self.conn(), recipe)?;
        tracing::info!(id, submitter = %recipe.name, dish = %recipe.dish, "recipe saved");
        Ok(id)
    }

    /// Validate, check for an existing (name, dish) pair and insert, all in
    /// one write transaction.
    pub fn submit_recipe(&mut self, recipe: &RecipeInput) -> Result<SubmitOutcome> {
        recipe.validate()?;

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if recipe_exists(&tx, &recipe.name, &recipe.dish)? {
            tracing::debug!(submitter = %recipe.name, dish = %recipe.dish, "recipe already exists");
            return Ok(SubmitOutcome::AlreadyExists);
        }

        let id = match insert_recipe(&tx, recipe) {
            Ok(id) => id,
            Err(StoreError::Duplicate) => return Ok(SubmitOutcome::AlreadyExists),
            Err(e) => return Err(e),
        };
        tx.commit()?;

        tracing::info!(id, submitter = %recipe.name, dish = %recipe.dish, "recipe submitted");
        Ok(SubmitOutcome::Created(id))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Whether a recipe with exactly this submitter and dish is stored.
    pub fn exists(&self, name: &str, dish: &str) -> Result<bool> {
        recipe_exists(self.conn(), name, dish)
    }

    /// Case-insensitive substring search on the dish name, ordered by id.
    ///
    /// Case folding covers ASCII letters only.  An empty query matches
    /// every recipe; callers that do not want that must check first.
    pub fn search_by_dish(&self, query: &str) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RECIPE_COLUMNS}
             FROM recipes
             WHERE dish LIKE ?1 ESCAPE '\\'
             ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map(params![like_pattern(query)], row_to_recipe)?;

        let mut recipes = Vec::new();
        for row in rows {
            recipes.push(row?);
        }
        tracing::debug!(query, matches = recipes.len(), "searched recipes");
        Ok(recipes)
    }

    /// Same matching as [`search_by_dish`](Self::search_by_dish) without
    /// loading media.
    pub fn search_summaries_by_dish(&self, query: &str) -> Result<Vec<RecipeSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, festival, dish, language, ingredients, instructions,
                    latitude, longitude,
                    image IS NOT NULL, video IS NOT NULL, audio IS NOT NULL
             FROM recipes
             WHERE dish LIKE ?1 ESCAPE '\\'
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![like_pattern(query)], row_to_summary)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Fetch a single recipe by id.
    pub fn get_recipe(&self, id: RecipeId) -> Result<Recipe> {
        self.conn()
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                params![id],
                row_to_recipe,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn count_recipes(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_recipe(conn: &Connection, recipe: &RecipeInput) -> Result<RecipeId> {
    conn.execute(
        "INSERT INTO recipes (name, festival, dish, language, ingredients, instructions,
                              image, latitude, longitude, video, audio)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            recipe.name,
            recipe.festival,
            recipe.dish,
            recipe.language,
            recipe.ingredients,
            recipe.instructions,
            recipe.image,
            recipe.latitude,
            recipe.longitude,
            recipe.video,
            recipe.audio,
        ],
    )
    .map_err(map_insert_error)?;
    Ok(conn.last_insert_rowid())
}

fn recipe_exists(conn: &Connection, name: &str, dish: &str) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM recipes WHERE name = ?1 AND dish = ?2)",
        params![name, dish],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(found)
}

/// `%query%` with LIKE metacharacters in `query` escaped by `\`.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Map a `rusqlite::Row` selected with `RECIPE_COLUMNS` to a [`Recipe`].
fn row_to_recipe(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        name: row.get(1)?,
        festival: row.get(2)?,
        dish: row.get(3)?,
        language: row.get(4)?,
        ingredients: row.get(5)?,
        instructions: row.get(6)?,
        image: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        video: row.get(10)?,
        audio: row.get(11)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeSummary> {
    Ok(RecipeSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        festival: row.get(2)?,
        dish: row.get(3)?,
        language: row.get(4)?,
        ingredients: row.get(5)?,
        instructions: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        has_image: row.get(9)?,
        has_video: row.get(10)?,
        has_audio: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flavors_shared::ValidationError;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn recipe(name: &str, dish: &str) -> RecipeInput {
        RecipeInput {
            name: name.into(),
            dish: dish.into(),
            language: "Tamil".into(),
            instructions: "Ferment overnight, steam in moulds".into(),
            ..Default::default()
        }
    }

    fn modak() -> RecipeInput {
        RecipeInput {
            name: "Asha".into(),
            dish: "Modak".into(),
            language: "Marathi".into(),
            instructions: "Steam and serve".into(),
            ingredients: Some("rice flour, jaggery".into()),
            ..Default::default()
        }
    }

    #[test]
    fn save_then_search_returns_the_input() {
        let db = db();
        let input = RecipeInput {
            festival: Some("Pongal".into()),
            ingredients: Some("rice, urad dal".into()),
            image: Some(vec![0xFF, 0xD8, 0xFF]),
            video: Some(vec![1, 2, 3, 4]),
            audio: Some(vec![b'R', b'I', b'F', b'F']),
            latitude: Some(13.0827),
            longitude: Some(80.2707),
            ..recipe("Meena", "Idli")
        };

        let id = db.save(&input).unwrap();
        let found = db.search_by_dish("Idli").unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].to_input(), input);
    }

    #[test]
    fn exists_flips_after_save() {
        let db = db();
        assert!(!db.exists("Meena", "Idli").unwrap());

        db.save(&recipe("Meena", "Idli")).unwrap();

        assert!(db.exists("Meena", "Idli").unwrap());
        assert!(!db.exists("Meena", "Dosa").unwrap());
        assert!(!db.exists("Ravi", "Idli").unwrap());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let db = db();
        db.save(&recipe("Meena", "Idli")).unwrap();

        for query in ["idli", "IDLI", "dl", "Idli"] {
            let found = db.search_by_dish(query).unwrap();
            assert_eq!(found.len(), 1, "query {query:?}");
            assert_eq!(found[0].dish, "Idli");
        }
        assert!(db.search_by_dish("dosa").unwrap().is_empty());
    }

    #[test]
    fn modak_scenario() {
        let db = db();
        db.save(&modak()).unwrap();

        assert!(db.exists("Asha", "Modak").unwrap());

        let found = db.search_by_dish("modak").unwrap();
        assert_eq!(found.len(), 1);
        let r = &found[0];
        assert_eq!(r.festival, None);
        assert_eq!(r.image, None);
        assert_eq!(r.ingredients.as_deref(), Some("rice flour, jaggery"));
        assert_eq!(r.location(), None);
    }

    #[test]
    fn empty_query_matches_everything() {
        let db = db();
        db.save(&recipe("Meena", "Idli")).unwrap();
        db.save(&recipe("Meena", "Dosa")).unwrap();

        assert_eq!(db.search_by_dish("").unwrap().len(), 2);
    }

    #[test]
    fn wildcards_in_query_match_literally() {
        let db = db();
        db.save(&recipe("Meena", "Idli")).unwrap();
        db.save(&recipe("Meena", "100% Ragi Dosa")).unwrap();

        assert!(db.search_by_dish("_dli").unwrap().is_empty());
        let found = db.search_by_dish("0% r").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dish, "100% Ragi Dosa");
    }

    #[test]
    fn results_are_ordered_by_id() {
        let db = db();
        let a = db.save(&recipe("Meena", "Rava Idli")).unwrap();
        let b = db.save(&recipe("Ravi", "Idli")).unwrap();

        let ids: Vec<_> = db.search_by_dish("idli").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn save_rejects_duplicate_pair() {
        let db = db();
        db.save(&recipe("Meena", "Idli")).unwrap();

        let err = db.save(&recipe("Meena", "Idli")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(db.count_recipes().unwrap(), 1);
    }

    #[test]
    fn submit_creates_then_reports_existing() {
        let mut db = db();

        let first = db.submit_recipe(&modak()).unwrap();
        assert!(matches!(first, SubmitOutcome::Created(_)));

        let second = db.submit_recipe(&modak()).unwrap();
        assert_eq!(second, SubmitOutcome::AlreadyExists);
        assert_eq!(db.count_recipes().unwrap(), 1);
    }

    #[test]
    fn submit_validates_before_touching_storage() {
        let mut db = db();
        let input = RecipeInput {
            language: String::new(),
            ..modak()
        };

        let err = db.submit_recipe(&input).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingField("language"))
        ));
        assert_eq!(db.count_recipes().unwrap(), 0);
    }

    #[test]
    fn submissions_from_two_handles_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");
        let mut first = Database::open_at(&path).unwrap();
        let mut second = Database::open_at(&path).unwrap();

        let a = first.submit_recipe(&modak()).unwrap();
        let b = second.submit_recipe(&modak()).unwrap();

        assert!(matches!(a, SubmitOutcome::Created(_)));
        assert_eq!(b, SubmitOutcome::AlreadyExists);
        assert_eq!(first.count_recipes().unwrap(), 1);
    }

    #[test]
    fn get_recipe_by_id() {
        let db = db();
        let id = db.save(&modak()).unwrap();

        assert_eq!(db.get_recipe(id).unwrap().dish, "Modak");
        assert!(matches!(db.get_recipe(id + 1), Err(StoreError::NotFound)));
    }

    #[test]
    fn summaries_flag_media_without_loading_it() {
        let db = db();
        let input = RecipeInput {
            audio: Some(vec![0u8; 64]),
            ..modak()
        };
        let id = db.save(&input).unwrap();

        let summaries = db.search_summaries_by_dish("MOD").unwrap();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.id, id);
        assert!(s.has_audio);
        assert!(!s.has_image);
        assert!(!s.has_video);
        assert_eq!(s, &RecipeSummary::from(&db.get_recipe(id).unwrap()));
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("idli"), "%idli%");
        assert_eq!(like_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
        assert_eq!(like_pattern(""), "%%");
    }
}

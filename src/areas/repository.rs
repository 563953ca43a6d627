use crate::areas::database::Database;
use crate::areas::lfs::LfsStorage;
use crate::areas::refs::{RefSet, Refs};
use crate::areas::store::Store;
use crate::artifacts::pack::PackIndex;
use crate::artifacts::rewrite::{self, SaveReport};
use anyhow::Context;
use std::cell::{RefCell, RefMut};
use std::path::Path;

pub struct Repository {
    /// Path to the git directory
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    refs: Refs,
    lfs: LfsStorage,
    store: Store,
    ref_set: RefSet,
}

impl Repository {
    /// Open the repository at `path`, which is either a git directory or a
    /// work tree holding one in `.git`
    ///
    /// Nothing is read yet; see [`Repository::load`].
    pub fn new(path: &str, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = Path::new(path)
            .canonicalize()
            .context(format!("Unable to open repository at {path}"))?;
        let path = match path.join(".git") {
            git_dir if git_dir.is_dir() => git_dir,
            _ => path,
        };

        if !path.join("objects").is_dir() {
            anyhow::bail!("Not a git directory: {}", path.display());
        }

        let database = Database::new(path.join("objects").into_boxed_path());
        let refs = Refs::new(path.clone().into_boxed_path());
        let lfs = LfsStorage::new(path.join("lfs").join("objects").into_boxed_path());

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            store: Store::new(database.clone()),
            database,
            refs,
            lfs,
            ref_set: RefSet::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn lfs_storage(&self) -> &LfsStorage {
        &self.lfs
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn ref_set(&self) -> &RefSet {
        &self.ref_set
    }

    /// Load every loose object and every ref, and resolve both
    pub async fn load(&mut self) -> anyhow::Result<()> {
        self.warn_about_packs()?;

        self.store = Store::load(self.database.clone()).await?;
        self.ref_set = self.refs.load()?;
        self.ref_set.resolve(&self.store);

        Ok(())
    }

    /// Save the whole reachable history and rewrite the refs
    pub fn save(&mut self) -> anyhow::Result<SaveReport> {
        let report = rewrite::save(&mut self.store, &mut self.ref_set)?;
        self.refs.write(&self.ref_set, &self.store)?;

        Ok(report)
    }

    fn warn_about_packs(&self) -> anyhow::Result<()> {
        for index_path in self.database.pack_indexes()? {
            let index = PackIndex::read(&index_path)?;
            tracing::warn!(
                pack = %index_path.display(),
                objects = index.object_count(),
                "packed objects are not loaded and will not be rewritten"
            );
        }

        Ok(())
    }
}

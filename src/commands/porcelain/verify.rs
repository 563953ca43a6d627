use crate::areas::repository::Repository;
use crate::errors::RewriteError;
use colored::Colorize;

impl Repository {
    /// Load and resolve everything, listing references that lead nowhere
    ///
    /// Fails if any object or ref points at a missing object.
    pub async fn verify(&mut self) -> anyhow::Result<()> {
        self.load().await?;

        let mut problems = 0;
        for missing in self.store().missing() {
            if let RewriteError::MissingObject { owner, name, oid } = missing {
                writeln!(
                    self.writer(),
                    "{} {oid} referenced by {owner} ({name})",
                    "missing".red()
                )?;
                problems += 1;
            }
        }

        for branch in self.ref_set().branches().iter().filter(|branch| branch.target().is_none()) {
            writeln!(
                self.writer(),
                "{} {} -> {}",
                "dangling ref".red(),
                branch.name(),
                branch.hash()
            )?;
            problems += 1;
        }

        if problems > 0 {
            anyhow::bail!("{problems} unresolved references");
        }

        writeln!(
            self.writer(),
            "{} {} objects, {} refs",
            "ok".green(),
            self.store().len(),
            self.ref_set().branches().len()
        )?;
        Ok(())
    }
}

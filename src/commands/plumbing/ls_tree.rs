use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RewriteError;

impl Repository {
    /// List a tree, or the tree of a commit
    pub fn ls_tree(&self, object_sha: &str, recursive: bool) -> anyhow::Result<()> {
        let object_id = ObjectId::try_parse(object_sha.to_string())?;
        let (object_type, payload) = self.database().read_object(&object_id)?;

        let tree_id = match object_type {
            ObjectType::Tree => object_id,
            ObjectType::Commit => Commit::deserialize(payload)?.tree().oid().clone(),
            other => {
                return Err(RewriteError::UnsupportedFormat(format!("{object_id} is a {other}, not a tree-ish")).into());
            }
        };

        self.list_tree(&tree_id, "", recursive)
    }

    fn list_tree(&self, tree_id: &ObjectId, prefix: &str, recursive: bool) -> anyhow::Result<()> {
        let (object_type, payload) = self.database().read_object(tree_id)?;
        if object_type != ObjectType::Tree {
            return Err(RewriteError::malformed(tree_id, format!("expected tree, found {object_type}")).into());
        }

        for entry in Tree::deserialize(payload)?.entries() {
            let path = format!("{prefix}{}", entry.name_lossy());

            if recursive && entry.mode().is_tree() {
                self.list_tree(entry.oid(), &format!("{path}/"), recursive)?;
            } else {
                writeln!(
                    self.writer(),
                    "{:0>6} {} {}\t{path}",
                    entry.mode().as_str(),
                    entry.mode().kind(),
                    entry.oid()
                )?;
            }
        }

        Ok(())
    }
}

use avl_roster::AvlTree;

fn main() {
    let mut tree = AvlTree::new();
    for key in 1..=6 {
        tree.insert(key, key.to_string()).unwrap();
    }

    println!("Level-order traversal:");
    for node in tree.iter_level_order() {
        println!(
            "Key: {}, Value: {}, Height: {}",
            node.key(),
            node.value(),
            node.height()
        );
    }
}

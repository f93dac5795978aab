//A heap where the keys range from [0, ..., n-1] and the scores are composite selection scores.
//The heap can be queried to return the key with the maximum score, and certain keys can be (temporarily) removed/readded as necessary
//It allows increasing the activities of its entries and toggling their bound flags

use crate::gourd_asserts::*;

/// The score used to order decision variables: variables with a lower bound
/// are preferred over variables without one, then variables with an upper
/// bound, and ties are broken by activity.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Debug)]
pub struct SelectionScore {
    pub has_lower_bound: bool,
    pub has_upper_bound: bool,
    pub activity: f64,
}

#[derive(Default)]
pub struct KeyValueHeap {
    scores: Vec<SelectionScore>, //contains the scores stored as a heap. The score of key i is in position map_key_to_position[i]
    map_key_to_position: Vec<u32>, //[i] shows the location of the score of the key i in the scores array
    map_position_to_key: Vec<u32>, //[i] shows which key is associated with scores[i]
    end_position: u32,             //the index past the last element in the heap
}

impl KeyValueHeap {
    pub fn new() -> KeyValueHeap {
        KeyValueHeap {
            scores: vec![],
            map_key_to_position: vec![],
            map_position_to_key: vec![],
            end_position: 0,
        }
    }

    //Return the key with maximum score from the heap, or None if the heap is empty. Note that this does not delete the key (see 'pop_max') to get and delete.
    //  O(1)
    pub fn peek_max(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.map_position_to_key[0])
        }
    }

    pub fn get_score(&self, key: u32) -> SelectionScore {
        gourd_assert_moderate!((key as usize) < self.map_key_to_position.len());
        self.scores[self.map_key_to_position[key as usize] as usize]
    }

    //Deletes the key with maximum score from the heap and returns it, or None if the heap is empty.
    //  O(logn)
    pub fn pop_max(&mut self) -> Option<u32> {
        let best_key = self.peek_max()?;
        self.delete_key(best_key);
        Some(best_key)
    }

    //increments the activity of the element of 'key' by 'increment'
    //  O(logn) worst case, but average case might be better.
    pub fn increment_activity(&mut self, key: u32, increment: f64) {
        let position = self.map_key_to_position[key as usize];
        self.scores[position as usize].activity += increment;
        //recall that increment may be applied to keys not present
        //   so we only apply sift up in case the key is present
        if self.is_key_present(key) {
            self.sift_up(position);
        }
    }

    //records whether the variable behind 'key' currently has a lower bound
    //  bounded variables float towards the top of the heap
    pub fn set_has_lower_bound(&mut self, key: u32, has_lower_bound: bool) {
        let position = self.map_key_to_position[key as usize];
        self.scores[position as usize].has_lower_bound = has_lower_bound;
        if self.is_key_present(key) {
            self.sift_up(position);
            self.sift_down(self.map_key_to_position[key as usize]);
        }
    }

    pub fn set_has_upper_bound(&mut self, key: u32, has_upper_bound: bool) {
        let position = self.map_key_to_position[key as usize];
        self.scores[position as usize].has_upper_bound = has_upper_bound;
        if self.is_key_present(key) {
            self.sift_up(position);
            self.sift_down(self.map_key_to_position[key as usize]);
        }
    }

    //Restores the entry with key 'key' to the heap if the key is not present, otherwise does nothing
    //  its score is the previous score used before 'delete_key' was called.
    //  O(logn)
    pub fn restore_key(&mut self, key: u32) {
        if !self.is_key_present(key) {
            //the key is somewhere in the range [end_position, max_size-1]
            //place the key at the end of the heap, increase end_position, and sift up
            let position = self.map_key_to_position[key as usize];
            gourd_assert_moderate!(position >= self.end_position);
            self.swap_positions(position, self.end_position);
            self.end_position += 1;
            self.sift_up(self.end_position - 1);
        }
    }

    //Removes the entry with key 'key' (temporarily) from the heap if the key is present, otherwise does nothing.
    //  its score remains recorded internally and is available upon calling 'restore_key'.
    //  the activity can still be subjected to 'divide_activities'.
    //  O(logn)
    pub fn delete_key(&mut self, key: u32) {
        if self.is_key_present(key) {
            //place the key at the end of the heap, decrement the heap, and sift down to ensure a valid heap
            let position = self.map_key_to_position[key as usize];
            self.swap_positions(position, self.end_position - 1);
            self.end_position -= 1;
            if position < self.end_position {
                self.sift_down(position);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end_position == 0
    }

    pub fn is_key_present(&self, key: u32) -> bool {
        self.map_key_to_position[key as usize] < self.end_position
    }

    //increases the size of the heap by one
    pub fn grow(&mut self, score: SelectionScore) {
        let new_key = self.scores.len() as u32;
        self.scores.push(score);
        self.map_key_to_position.push(new_key); //initially the key is placed at the very end, will be placed in the correct position below to ensure a valid heap structure
        self.map_position_to_key.push(new_key);
        self.swap_positions(self.end_position, new_key);
        self.end_position += 1;
        self.sift_up(self.end_position - 1);
    }

    //divides all the activities in the heap by 'divisor'. This will affect the activities of keys that have been removed.
    //  O(n)
    pub fn divide_activities(&mut self, divisor: f64) {
        for score in self.scores.iter_mut() {
            score.activity /= divisor;
        }
    }

    fn swap_positions(&mut self, a: u32, b: u32) {
        //changing the type for convenience
        let a = a as usize;
        let b = b as usize;

        let key_i = self.map_position_to_key[a] as usize;
        let key_j = self.map_position_to_key[b] as usize;

        self.scores.swap(a, b);
        self.map_position_to_key.swap(a, b);
        self.map_key_to_position.swap(key_i, key_j);
    }

    fn sift_up(&mut self, position: u32) {
        //only sift up if not at the root
        if position > 0 {
            let parent_position = KeyValueHeap::get_parent_position(position);
            //continue sift up if the heap property is violated
            if self.scores[parent_position as usize] < self.scores[position as usize] {
                self.swap_positions(parent_position, position);
                self.sift_up(parent_position);
            }
        }
    }

    fn sift_down(&mut self, position: u32) {
        gourd_assert_moderate!(position < self.end_position);

        if !self.is_heap_locally(position) {
            let largest_child_position = self.get_largest_child_position(position);
            self.swap_positions(largest_child_position, position);
            self.sift_down(largest_child_position);
        }
    }

    fn is_heap_locally(&self, position: u32) -> bool {
        //either the node is a leaf, or it satisfies the heap property (the score of the parent is at least as large as the scores of its children)
        let left_child_position = KeyValueHeap::get_left_child_position(position);
        let right_child_position = KeyValueHeap::get_right_child_position(position);

        self.is_leaf(position)
            || (self.scores[position as usize] >= self.scores[left_child_position as usize]
                && (right_child_position >= self.end_position
                    || self.scores[position as usize]
                        >= self.scores[right_child_position as usize]))
    }

    fn is_leaf(&self, position: u32) -> bool {
        KeyValueHeap::get_left_child_position(position) >= self.end_position
    }

    fn get_largest_child_position(&self, position: u32) -> u32 {
        gourd_assert_moderate!(!self.is_leaf(position));

        let left_child_position = KeyValueHeap::get_left_child_position(position);
        let right_child_position = KeyValueHeap::get_right_child_position(position);

        if right_child_position < self.end_position
            && self.scores[right_child_position as usize]
                > self.scores[left_child_position as usize]
        {
            right_child_position
        } else {
            left_child_position
        }
    }

    fn get_parent_position(child_position: u32) -> u32 {
        gourd_assert_moderate!(child_position > 0, "Root has no parent.");
        (child_position - 1) / 2
    }

    fn get_left_child_position(position: u32) -> u32 {
        2 * position + 1
    }

    fn get_right_child_position(position: u32) -> u32 {
        2 * position + 2
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueHeap, SelectionScore};

    fn score(activity: f64) -> SelectionScore {
        SelectionScore {
            has_lower_bound: false,
            has_upper_bound: false,
            activity,
        }
    }

    #[test]
    fn test_max_by_activity() {
        let mut heap = KeyValueHeap::new();
        heap.grow(score(1.0));
        heap.grow(score(5.0));
        heap.grow(score(3.0));

        assert!(heap.peek_max() == Some(1));
        assert!(heap.pop_max() == Some(1));
        assert!(heap.pop_max() == Some(2));
        assert!(heap.pop_max() == Some(0));
        assert!(heap.pop_max().is_none());
    }

    #[test]
    fn test_bounded_variables_are_preferred() {
        let mut heap = KeyValueHeap::new();
        heap.grow(score(10.0));
        heap.grow(score(1.0));

        //key 1 has a small activity but becomes bounded, which dominates
        heap.set_has_lower_bound(1, true);
        heap.set_has_upper_bound(1, true);
        assert!(heap.peek_max() == Some(1));

        //removing the bound flags demotes the key again
        heap.set_has_lower_bound(1, false);
        heap.set_has_upper_bound(1, false);
        assert!(heap.peek_max() == Some(0));
    }

    #[test]
    fn test_delete_and_restore() {
        let mut heap = KeyValueHeap::new();
        heap.grow(score(2.0));
        heap.grow(score(4.0));
        heap.grow(score(8.0));

        heap.delete_key(2);
        assert!(!heap.is_key_present(2));
        assert!(heap.peek_max() == Some(1));

        //the score survives deletion and can still be bumped
        heap.increment_activity(2, 1.0);
        heap.restore_key(2);
        assert!(heap.is_key_present(2));
        assert!(heap.peek_max() == Some(2));
        assert!(heap.get_score(2).activity == 9.0);
    }
}
